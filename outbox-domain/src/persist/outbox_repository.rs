//! Outbox 存储协议
//!
use crate::error::{DomainError, DomainResult as Result};
use crate::event::{EventId, EventStatus, OutboxEvent, Topic};
use async_trait::async_trait;
use std::sync::Arc;

/// Outbox 存储：事件状态的唯一事实来源
///
/// 在工作单元内执行时写入具备事务性；读取可以是快照隔离的。
#[async_trait]
pub trait OutboxRepository<T: Topic>: Send + Sync {
    /// 保存事件（按 id 幂等）
    ///
    /// - id 不存在：插入新事件；
    /// - id 已存在且不可变字段一致：以给定值覆盖 `publications`/`status`/`was_quarantined`，
    ///   后写覆盖，不做合并；
    /// - id 已存在但描述的是另一次业务发生：返回 `DomainError::DuplicateEventId`。
    async fn save(&self, event: &OutboxEvent<T>) -> Result<()>;

    async fn get_by_id(&self, id: &EventId) -> Result<Option<OutboxEvent<T>>>;

    /// 查询状态属于给定集合的事件，按 `occurred_at` 升序
    async fn find_by_status(&self, statuses: &[EventStatus]) -> Result<Vec<OutboxEvent<T>>>;
}

#[async_trait]
impl<T, R> OutboxRepository<T> for Arc<R>
where
    T: Topic,
    R: OutboxRepository<T> + ?Sized,
{
    async fn save(&self, event: &OutboxEvent<T>) -> Result<()> {
        (**self).save(event).await
    }

    async fn get_by_id(&self, id: &EventId) -> Result<Option<OutboxEvent<T>>> {
        (**self).get_by_id(id).await
    }

    async fn find_by_status(&self, statuses: &[EventStatus]) -> Result<Vec<OutboxEvent<T>>> {
        (**self).find_by_status(statuses).await
    }
}

/// 覆盖已有记录前的校验：同一 id 必须对应同一次业务发生
pub(crate) fn ensure_same_occurrence<T: Topic>(
    existing: &OutboxEvent<T>,
    incoming: &OutboxEvent<T>,
) -> Result<()> {
    if existing.is_same_occurrence(incoming) {
        Ok(())
    } else {
        Err(DomainError::DuplicateEventId {
            event_id: incoming.id().to_string(),
        })
    }
}
