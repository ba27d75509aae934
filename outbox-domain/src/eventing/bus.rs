//! 事件总线（EventBus）
//!
//! 投递算法：
//! 1. 查找事件主题的订阅者；
//! 2. 从未发布或被强制重投的事件运行全部订阅者，否则只运行最近一次投递
//!    （按 `published_at` 取最大）中失败的订阅者；
//! 3. 各订阅者相互独立地执行，单个失败被捕获记录，不影响其他订阅者；
//! 4. 以当前时间构建新的投递记录并追加到历史；
//! 5. 推导新状态：无失败为 `published`，累计投递达到上限仍失败为
//!    `failed-too-many-times`（同时隔离），否则 `failed-but-will-retry`；
//! 6. 经工作单元保存事件。
//!
//! 只有基础设施失败（例如保存事件失败）会从 `publish` 返回错误，此时本次尝试视为未发生。
//!
use crate::clock::{Clock, SystemClock};
use crate::error::DomainResult as Result;
use crate::event::{
    EventFailure, EventPublication, EventStatus, MAX_PUBLICATIONS_BEFORE_QUARANTINE, OutboxEvent,
    Topic,
};
use crate::subscription::SubscriptionRegistry;
use crate::uow::{UnitOfWork, UnitOfWorkPerformer};
use bon::Builder;
use anyhow::anyhow;
use futures_util::{FutureExt, StreamExt, stream};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Builder)]
pub struct EventBus<T, P>
where
    T: Topic,
    P: UnitOfWorkPerformer<T>,
{
    registry: Arc<SubscriptionRegistry<T>>,
    uow_performer: Arc<P>,
    #[builder(default = Arc::new(SystemClock) as Arc<dyn Clock>)]
    clock: Arc<dyn Clock>,
    #[builder(default)]
    config: EventBusConfig,
}

impl<T, P> EventBus<T, P>
where
    T: Topic,
    P: UnitOfWorkPerformer<T>,
{
    pub fn registry(&self) -> &SubscriptionRegistry<T> {
        &self.registry
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    /// 发布事件，返回记录了本次投递结果的事件
    ///
    /// 最近一次投递已无失败且未被强制重投的事件不会再次运行任何订阅者，原样返回。
    #[tracing::instrument(
        name = "event_bus.publish",
        skip_all,
        fields(event_id = %event.id(), topic = %event.topic())
    )]
    pub async fn publish(&self, mut event: OutboxEvent<T>) -> Result<OutboxEvent<T>> {
        let selection = event.subscriptions_to_run();
        if selection.is_empty() {
            debug!(status = %event.status(), "nothing left to deliver");
            return Ok(event);
        }

        let to_run: Vec<_> = self
            .registry
            .subscribers_for(event.topic())
            .into_iter()
            .filter(|(id, _)| selection.includes(id))
            .collect();

        let current = &event;
        let invocations: Vec<_> = to_run
            .into_iter()
            .map(|(subscription_id, subscriber)| async move {
                debug!(%subscription_id, "invoking subscriber");
                let outcome = AssertUnwindSafe(subscriber.handle(current))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(anyhow!(panic_message(panic.as_ref()))));
                match outcome {
                    Ok(()) => None,
                    Err(err) => {
                        let message = format!("{err:#}");
                        warn!(%subscription_id, error = %message, "subscriber failed");
                        Some(EventFailure::new(subscription_id, message))
                    }
                }
            })
            .collect();

        let mut failures: Vec<EventFailure> = stream::iter(invocations)
            .buffer_unordered(self.config.subscriber_concurrency.max(1))
            .filter_map(|outcome| async move { outcome })
            .collect()
            .await;
        failures.sort_by(|a, b| a.subscription_id().cmp(b.subscription_id()));

        event.record_publication(
            EventPublication::new(self.clock.now(), failures),
            self.config.max_publications,
        );

        match event.status() {
            EventStatus::Published => info!(
                attempts = event.publications().len(),
                "event published"
            ),
            EventStatus::FailedTooManyTimes => error!(
                attempts = event.publications().len(),
                failures = event.latest_failures().len(),
                "event failed too many times, quarantined"
            ),
            status => warn!(
                %status,
                attempts = event.publications().len(),
                failures = event.latest_failures().len(),
                "event delivery failed, will retry"
            ),
        }

        let to_save = event.clone();
        self.uow_performer
            .perform(move |uow| {
                Box::pin(async move { uow.outbox_repository().save(&to_save).await })
            })
            .await?;

        Ok(event)
    }
}

/// 订阅者 panic 时记录的失败信息
fn panic_message(panic: &(dyn Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned());
    match detail {
        Some(detail) => format!("subscriber panicked: {detail}"),
        None => "subscriber panicked".to_string(),
    }
}

/// 事件总线配置
#[derive(Clone, Copy, Debug)]
pub struct EventBusConfig {
    /// 累计投递次数上限（含首次），达到后仍失败即隔离
    pub max_publications: usize,
    /// 单事件内订阅者的并发度
    pub subscriber_concurrency: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            max_publications: MAX_PUBLICATIONS_BEFORE_QUARANTINE,
            subscriber_concurrency: 8,
        }
    }
}
