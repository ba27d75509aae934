use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 订阅标识：稳定的订阅名称，用于只重试此前失败的订阅者
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriptionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SubscriptionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// 单个订阅者在一次投递中的失败
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFailure {
    subscription_id: SubscriptionId,
    /// 仅用于诊断，不参与控制流
    error_message: String,
}

impl EventFailure {
    pub fn new(subscription_id: impl Into<SubscriptionId>, error_message: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            error_message: error_message.into(),
        }
    }

    pub fn subscription_id(&self) -> &SubscriptionId {
        &self.subscription_id
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }
}

/// 一次投递尝试
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPublication {
    published_at: DateTime<Utc>,
    failures: Vec<EventFailure>,
}

impl EventPublication {
    pub fn new(published_at: DateTime<Utc>, failures: Vec<EventFailure>) -> Self {
        Self {
            published_at,
            failures,
        }
    }

    /// 无失败的投递
    pub fn succeeded_at(published_at: DateTime<Utc>) -> Self {
        Self::new(published_at, Vec::new())
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    pub fn failures(&self) -> &[EventFailure] {
        &self.failures
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failed_subscriptions(&self) -> impl Iterator<Item = &SubscriptionId> {
        self.failures.iter().map(EventFailure::subscription_id)
    }
}
