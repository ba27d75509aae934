//! 事件模型（event）
//!
//! - `OutboxEvent`：不可变的业务事件记录，仅投递历史与粗粒度状态会增长/变化；
//! - `EventPublication` / `EventFailure`：一次投递尝试及其按订阅者的失败；
//! - `EventStatus`：事件生命周期；
//! - `Topic` / `TopicPayload`：封闭的主题目录与主题到载荷形状的映射；
//! - `EventFactory`：统一的事件创建入口。
//!
mod event_id;
mod factory;
mod outbox_event;
mod publication;
mod status;
mod topic;

pub use event_id::EventId;
pub use factory::EventFactory;
pub use outbox_event::{MAX_PUBLICATIONS_BEFORE_QUARANTINE, OutboxEvent, SubscriptionSelection};
pub use publication::{EventFailure, EventPublication, SubscriptionId};
pub use status::EventStatus;
pub use topic::{Topic, TopicPayload};
