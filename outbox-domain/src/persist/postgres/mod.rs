//! Postgres 实现（feature = "postgres"）
//!
//! - `PgUnitOfWorkPerformer`：每次 `perform` 开启一个事务；
//! - `PgUnitOfWork`：事务句柄，业务存储可通过 `transaction()` 在同一事务中执行语句；
//! - `PgOutboxRepository`：`outbox` 表（见 `migrations/0001_create_outbox.sql`）。
//!
mod outbox_repository;
mod unit_of_work;

pub use outbox_repository::PgOutboxRepository;
pub use unit_of_work::{PgUnitOfWork, PgUnitOfWorkPerformer};
