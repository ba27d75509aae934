//! 事件投递（eventing）
//!
//! - `EventBus`：对单个事件执行本轮应运行的订阅者，记录按订阅者的失败，
//!   推导事件的下一生命周期状态并经工作单元持久化；
//! - `EventCrawler`：周期、单飞的重投驱动器，从 Outbox 拉取需要（再）投递的事件交给总线。
//!
//! 同一事件 id 上的并发 `publish` 不安全，需要单写者纪律：驱动器在一个周期内按 id 去重，
//! 且同一时刻只有一个周期在运行。
//!
pub mod bus;
pub mod crawler;

pub use bus::{EventBus, EventBusConfig};
pub use crawler::{CrawlReport, CrawlerConfig, CrawlerHandle, EventCrawler};
