//! 持久化（persist）
//!
//! 定义 Outbox 存储协议及其实现：
//! - `OutboxRepository`：按 id 追加/覆盖事件、按状态查询待投递事件；
//! - `InMemoryOutboxRepository`：内存实现（测试、示例与单进程部署）；
//! - `postgres`（feature = "postgres"）：基于 sqlx 的事务性实现。
//!
mod inmemory_outbox_repository;
mod outbox_repository;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use inmemory_outbox_repository::InMemoryOutboxRepository;
pub use outbox_repository::OutboxRepository;
