//! 工作单元（uow）
//!
//! 事务边界：一次用例的领域写入与其产生的事件要么一起持久化，要么都不生效。
//! - `UnitOfWork`：事务内的句柄，暴露 Outbox 存储（及具体实现提供的业务存储）；
//! - `UnitOfWorkPerformer`：开启事务、执行工作、正常返回时提交、出错时回滚。
//!
//! 工作单元本身不发布事件，发布是独立解耦的一步。
//!
mod inmemory;

pub use inmemory::{InMemoryUnitOfWork, InMemoryUnitOfWorkPerformer};

use crate::error::DomainError;
use crate::event::Topic;
use crate::persist::OutboxRepository;
use async_trait::async_trait;
use futures_util::future::BoxFuture;

/// 事务内句柄
pub trait UnitOfWork<T: Topic>: Send + Sync {
    fn outbox_repository(&self) -> &dyn OutboxRepository<T>;
}

/// 工作单元执行器
#[async_trait]
pub trait UnitOfWorkPerformer<T: Topic>: Send + Sync {
    type Uow: UnitOfWork<T>;

    /// 在一个原子事务中执行 `work`
    ///
    /// `work` 返回 `Ok` 时提交；返回任何错误（包括保存事件本身的错误）时回滚。
    /// 提交失败以 `DomainError` 转换为 `E` 返回。
    ///
    /// ```ignore
    /// performer
    ///     .perform(|uow| {
    ///         Box::pin(async move {
    ///             uow.outbox_repository().save(&event).await?;
    ///             Ok::<_, DomainError>(())
    ///         })
    ///     })
    ///     .await?;
    /// ```
    async fn perform<R, E, F>(&self, work: F) -> Result<R, E>
    where
        R: Send,
        E: From<DomainError> + Send,
        F: for<'u> FnOnce(&'u mut Self::Uow) -> BoxFuture<'u, Result<R, E>> + Send;
}
