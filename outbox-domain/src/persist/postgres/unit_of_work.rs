use super::PgOutboxRepository;
use crate::error::DomainError;
use crate::event::Topic;
use crate::persist::OutboxRepository;
use crate::uow::{UnitOfWork, UnitOfWorkPerformer};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use sqlx::{PgPool, Postgres, Transaction};
use std::marker::PhantomData;
use tokio::sync::MutexGuard;
use tracing::{debug, warn};

/// Postgres 事务句柄
pub struct PgUnitOfWork<T: Topic> {
    outbox: PgOutboxRepository<T>,
}

impl<T: Topic> PgUnitOfWork<T> {
    fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            outbox: PgOutboxRepository::new(tx),
        }
    }

    /// 当前事务：业务存储在此执行语句，与事件写入一同提交/回滚
    ///
    /// 返回的守卫与 `outbox_repository()` 的读写共用同一把锁：
    /// 调用 `save`/`get_by_id`/`find_by_status` 之前必须先释放守卫，否则会死锁。
    ///
    /// ```ignore
    /// {
    ///     let mut tx = uow.transaction().await;
    ///     sqlx::query("UPDATE conventions SET status = $1 WHERE id = $2")
    ///         .bind("READY_TO_SIGN")
    ///         .bind(&convention_id)
    ///         .execute(&mut **tx)
    ///         .await?;
    /// } // 守卫在此释放
    /// uow.outbox_repository().save(&event).await?;
    /// ```
    pub async fn transaction(&self) -> MutexGuard<'_, Transaction<'static, Postgres>> {
        self.outbox.transaction().await
    }

    fn into_transaction(self) -> Transaction<'static, Postgres> {
        self.outbox.into_transaction()
    }
}

impl<T: Topic> UnitOfWork<T> for PgUnitOfWork<T> {
    fn outbox_repository(&self) -> &dyn OutboxRepository<T> {
        &self.outbox
    }
}

#[derive(Clone)]
pub struct PgUnitOfWorkPerformer<T> {
    pool: PgPool,
    _topic: PhantomData<fn() -> T>,
}

impl<T: Topic> PgUnitOfWorkPerformer<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _topic: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Topic> UnitOfWorkPerformer<T> for PgUnitOfWorkPerformer<T> {
    type Uow = PgUnitOfWork<T>;

    async fn perform<R, E, F>(&self, work: F) -> Result<R, E>
    where
        R: Send,
        E: From<DomainError> + Send,
        F: for<'u> FnOnce(&'u mut Self::Uow) -> BoxFuture<'u, Result<R, E>> + Send,
    {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|err| E::from(DomainError::from(err)))?;
        let mut uow = PgUnitOfWork::new(tx);

        match work(&mut uow).await {
            Ok(value) => {
                uow.into_transaction()
                    .commit()
                    .await
                    .map_err(|err| E::from(DomainError::from(err)))?;
                debug!("postgres unit of work committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = uow.into_transaction().rollback().await {
                    warn!(error = %rollback_err, "postgres unit of work rollback failed");
                }
                Err(err)
            }
        }
    }
}
