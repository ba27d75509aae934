//! 订阅（subscription）
//!
//! - `Subscriber`：消费某一主题事件的回调；
//! - `SubscriptionRegistry`：进程内注册表，启动时由静态装配构建一次，之后只读。
//!
mod registry;
mod subscriber;

pub use crate::event::SubscriptionId;
pub use registry::SubscriptionRegistry;
pub use subscriber::{FnSubscriber, PayloadSubscriber, Subscriber, TimeoutSubscriber};
