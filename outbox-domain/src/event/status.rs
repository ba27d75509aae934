use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 事件生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventStatus {
    /// 尚未发布
    NeverPublished,
    /// 最近一次投递无失败
    Published,
    /// 最近一次投递有失败，仍在重试额度内
    FailedButWillRetry,
    /// 重试额度耗尽（终态，需人工介入）
    FailedTooManyTimes,
    /// 运维强制全量重投
    ToRepublish,
}

impl EventStatus {
    /// 新事件与强制重投事件
    pub const TO_PUBLISH: [EventStatus; 2] = [EventStatus::NeverPublished, EventStatus::ToRepublish];

    /// 等待重试的失败事件
    pub const TO_RETRY: [EventStatus; 1] = [EventStatus::FailedButWillRetry];

    /// 重投驱动器每个周期需要处理的全部状态
    pub const NEEDING_DELIVERY: [EventStatus; 3] = [
        EventStatus::NeverPublished,
        EventStatus::FailedButWillRetry,
        EventStatus::ToRepublish,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            EventStatus::NeverPublished => "never-published",
            EventStatus::Published => "published",
            EventStatus::FailedButWillRetry => "failed-but-will-retry",
            EventStatus::FailedTooManyTimes => "failed-too-many-times",
            EventStatus::ToRepublish => "to-republish",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "never-published" => Ok(EventStatus::NeverPublished),
            "published" => Ok(EventStatus::Published),
            "failed-but-will-retry" => Ok(EventStatus::FailedButWillRetry),
            "failed-too-many-times" => Ok(EventStatus::FailedTooManyTimes),
            "to-republish" => Ok(EventStatus::ToRepublish),
            other => Err(DomainError::Parse {
                reason: format!("unknown event status: {other}"),
            }),
        }
    }
}
