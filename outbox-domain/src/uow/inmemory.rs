//! 内存版工作单元
//!
//! 已提交状态（Outbox 表 + 调用方定义的业务存储 `S`）由一把异步互斥锁保护，
//! 事务串行执行：`perform` 复制一份工作副本交给 `work`，仅当其返回 `Ok` 时替换已提交状态。
//! `S` 须是值语义（克隆即深拷贝），否则回滚无法撤销其中的写入。
//!
//! 不要在 `perform` 的工作中再次调用同一执行器（包括 `EventBus::publish`），互斥锁不可重入。
//!
use super::{UnitOfWork, UnitOfWorkPerformer};
use crate::error::DomainError;
use crate::event::{OutboxEvent, Topic};
use crate::persist::{InMemoryOutboxRepository, OutboxRepository};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::debug;

/// 内存工作单元：Outbox 存储与业务存储的工作副本
#[derive(Clone)]
pub struct InMemoryUnitOfWork<T: Topic, S = ()> {
    outbox: InMemoryOutboxRepository<T>,
    stores: S,
}

impl<T: Topic, S> InMemoryUnitOfWork<T, S> {
    pub fn outbox(&self) -> &InMemoryOutboxRepository<T> {
        &self.outbox
    }

    pub fn stores(&self) -> &S {
        &self.stores
    }

    pub fn stores_mut(&mut self) -> &mut S {
        &mut self.stores
    }
}

impl<T, S> UnitOfWork<T> for InMemoryUnitOfWork<T, S>
where
    T: Topic,
    S: Send + Sync,
{
    fn outbox_repository(&self) -> &dyn OutboxRepository<T> {
        &self.outbox
    }
}

pub struct InMemoryUnitOfWorkPerformer<T: Topic, S = ()> {
    committed: Mutex<InMemoryUnitOfWork<T, S>>,
}

impl<T, S> Default for InMemoryUnitOfWorkPerformer<T, S>
where
    T: Topic,
    S: Default,
{
    fn default() -> Self {
        Self::with_stores(S::default())
    }
}

impl<T: Topic, S> InMemoryUnitOfWorkPerformer<T, S> {
    pub fn new() -> Self
    where
        S: Default,
    {
        Self::default()
    }

    /// 以给定的业务存储初始状态创建
    pub fn with_stores(stores: S) -> Self {
        Self {
            committed: Mutex::new(InMemoryUnitOfWork {
                outbox: InMemoryOutboxRepository::new(),
                stores,
            }),
        }
    }

    /// 已提交状态的快照
    pub async fn snapshot(&self) -> InMemoryUnitOfWork<T, S>
    where
        S: Clone,
    {
        self.committed.lock().await.clone()
    }

    /// 已提交的全部事件，按 `occurred_at` 升序
    pub async fn events(&self) -> Vec<OutboxEvent<T>> {
        self.committed.lock().await.outbox.all_events()
    }
}

#[async_trait]
impl<T, S> UnitOfWorkPerformer<T> for InMemoryUnitOfWorkPerformer<T, S>
where
    T: Topic,
    S: Clone + Send + Sync,
{
    type Uow = InMemoryUnitOfWork<T, S>;

    async fn perform<R, E, F>(&self, work: F) -> Result<R, E>
    where
        R: Send,
        E: From<DomainError> + Send,
        F: for<'u> FnOnce(&'u mut Self::Uow) -> BoxFuture<'u, Result<R, E>> + Send,
    {
        let mut committed = self.committed.lock().await;
        let mut working = committed.clone();

        let result = work(&mut working).await;

        if result.is_ok() {
            *committed = working;
            debug!("in-memory unit of work committed");
        } else {
            debug!("in-memory unit of work rolled back");
        }

        result
    }
}
