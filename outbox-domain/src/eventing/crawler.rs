//! 重投驱动器（EventCrawler）
//!
//! 周期性地从 Outbox 查询需要（再）投递的事件，并以有界并发交给 `EventBus`：
//! - `process_new_events`：`never-published` 与 `to-republish`；
//! - `retry_failed_events`：`failed-but-will-retry`；
//! - `tick`：一次覆盖以上三种状态。
//!
//! 驱动器在周期之间不保存状态，所有状态都在 Outbox 中。
//! 周期是单飞的：上一个周期尚未结束时开始的周期直接跳过。
//!
use super::EventBus;
use crate::error::DomainResult as Result;
use crate::event::{EventStatus, OutboxEvent, Topic};
use crate::uow::{UnitOfWork, UnitOfWorkPerformer};
use bon::Builder;
use futures_util::{StreamExt, stream};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Builder)]
pub struct EventCrawler<T, P>
where
    T: Topic,
    P: UnitOfWorkPerformer<T>,
{
    event_bus: Arc<EventBus<T, P>>,
    uow_performer: Arc<P>,
    #[builder(default)]
    config: CrawlerConfig,
    #[builder(skip)]
    in_flight: Mutex<()>,
}

impl<T, P> EventCrawler<T, P>
where
    T: Topic,
    P: UnitOfWorkPerformer<T>,
{
    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// 投递所有需要（再）投递的事件
    pub async fn tick(&self) -> Result<CrawlReport> {
        self.crawl("tick", &EventStatus::NEEDING_DELIVERY).await
    }

    /// 投递新事件与被强制重投的事件
    pub async fn process_new_events(&self) -> Result<CrawlReport> {
        self.crawl("new_events", &EventStatus::TO_PUBLISH).await
    }

    /// 重试上次投递仍有失败的事件
    pub async fn retry_failed_events(&self) -> Result<CrawlReport> {
        self.crawl("failed_events", &EventStatus::TO_RETRY).await
    }

    async fn crawl(
        &self,
        cadence: &'static str,
        statuses: &'static [EventStatus],
    ) -> Result<CrawlReport> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!(cadence, "previous crawl still running, skipping");
            return Ok(CrawlReport::overlapped());
        };

        let events = self
            .uow_performer
            .perform(move |uow| {
                Box::pin(async move { uow.outbox_repository().find_by_status(statuses).await })
            })
            .await
            .inspect_err(|err| {
                error!(cadence, error = %err, "crawl abandoned, could not fetch events");
            })?;

        let mut report = CrawlReport {
            ran: true,
            fetched: events.len(),
            ..CrawlReport::default()
        };

        let mut seen = HashSet::with_capacity(events.len());
        let mut to_publish: Vec<OutboxEvent<T>> = Vec::with_capacity(events.len());
        for event in events {
            if !seen.insert(*event.id()) {
                continue;
            }
            if event.was_quarantined() && event.status() != EventStatus::ToRepublish {
                debug!(event_id = %event.id(), topic = %event.topic(), "quarantined event skipped");
                report.skipped += 1;
                continue;
            }
            to_publish.push(event);
        }

        let bus = &self.event_bus;
        let publications: Vec<_> = to_publish
            .into_iter()
            .map(|event| async move {
                let event_id = *event.id();
                (event_id, bus.publish(event).await)
            })
            .collect();
        let mut outcomes = stream::iter(publications)
            .buffer_unordered(self.config.max_events_in_parallel.max(1));

        while let Some((event_id, outcome)) = outcomes.next().await {
            match outcome {
                Ok(event) => match event.status() {
                    EventStatus::Published => report.published += 1,
                    EventStatus::FailedTooManyTimes => report.quarantined += 1,
                    _ => report.failed += 1,
                },
                Err(err) => {
                    error!(%event_id, error = %err, "event could not be published");
                    report.errored += 1;
                }
            }
        }

        info!(
            cadence,
            fetched = report.fetched,
            published = report.published,
            failed = report.failed,
            quarantined = report.quarantined,
            errored = report.errored,
            skipped = report.skipped,
            "crawl finished"
        );

        Ok(report)
    }
}

impl<T, P> EventCrawler<T, P>
where
    T: Topic,
    P: UnitOfWorkPerformer<T> + 'static,
{
    /// 启动两个周期任务，返回可用于关闭/等待的句柄
    pub fn start(self: Arc<Self>) -> CrawlerHandle {
        let token = CancellationToken::new();
        let mut tasks: Vec<JoinHandle<()>> = Vec::with_capacity(2);

        {
            let crawler = self.clone();
            tasks.push(Self::spawn_periodic(
                token.clone(),
                self.config.new_events_interval,
                move || {
                    let crawler = crawler.clone();
                    async move {
                        let _ = crawler.process_new_events().await;
                    }
                },
            ));
        }

        {
            let crawler = self.clone();
            tasks.push(Self::spawn_periodic(
                token.clone(),
                self.config.failed_events_interval,
                move || {
                    let crawler = crawler.clone();
                    async move {
                        let _ = crawler.retry_failed_events().await;
                    }
                },
            ));
        }

        CrawlerHandle { token, tasks }
    }

    fn spawn_periodic<F, Fut>(
        token: CancellationToken,
        interval: Duration,
        mut f: F,
    ) -> JoinHandle<()>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => f().await,
                }
            }
        })
    }
}

/// 单个周期的统计
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// 为 false 表示与进行中的周期重叠而被跳过
    pub ran: bool,
    pub fetched: usize,
    pub published: usize,
    pub failed: usize,
    pub quarantined: usize,
    /// 发布时遇到基础设施错误的事件数
    pub errored: usize,
    /// 因已隔离而跳过的事件数
    pub skipped: usize,
}

impl CrawlReport {
    fn overlapped() -> Self {
        Self::default()
    }
}

/// 重投驱动器配置
#[derive(Clone, Copy, Debug)]
pub struct CrawlerConfig {
    /// 新事件（含强制重投）的轮询间隔
    pub new_events_interval: Duration,
    /// 失败事件的重试间隔
    pub failed_events_interval: Duration,
    /// 单个周期内并发发布的事件数
    pub max_events_in_parallel: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            new_events_interval: Duration::from_secs(10),
            failed_events_interval: Duration::from_secs(60),
            max_events_in_parallel: 5,
        }
    }
}

/// 驱动器运行句柄：用于优雅关闭与等待任务结束
pub struct CrawlerHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl CrawlerHandle {
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub async fn join(mut self) {
        let tasks = std::mem::take(&mut self.tasks);

        for t in tasks {
            let _ = t.await;
        }
    }
}

impl Drop for CrawlerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
