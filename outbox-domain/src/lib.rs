//! 事务性 Outbox 与至少一次投递引擎（outbox-domain）
//!
//! 提供以 Outbox 模式为中心的通用抽象与构件：
//! - 事件模型（`event`）：事件、投递记录、失败记录、生命周期状态与主题目录；
//! - Outbox 存储（`persist`）：按状态查询的事件仓储协议及内存/Postgres 实现；
//! - 工作单元（`uow`）：让业务写入与事件写入在同一事务中提交或回滚；
//! - 订阅（`subscription`）：主题到订阅者回调的注册表；
//! - 事件投递（`eventing`）：事件总线（按订阅者记录成败、重试、隔离）与周期重投驱动器。
//!
//! 典型用法：
//! 1. 使用 `#[topic]` 宏声明本次部署的封闭主题目录；
//! 2. 在用例中通过 `UnitOfWorkPerformer::perform` 写入业务数据，
//!    并用 `EventFactory` 创建事件、通过 `OutboxRepository::save` 一并保存；
//! 3. 启动时构建 `SubscriptionRegistry`，注入 `EventBus`；
//! 4. 由 `EventCrawler` 周期拉取待投递事件交给总线发布。
//!
pub mod clock;
pub mod error;
pub mod event;
pub mod eventing;
pub mod id_generator;
pub mod persist;
pub mod subscription;
pub mod uow;

// 允许在本 crate 内部通过 ::outbox_domain 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::outbox_domain 路径。
extern crate self as outbox_domain;
