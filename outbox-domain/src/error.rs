//! 领域层统一错误定义
//!
//! 聚焦序列化、主题解析、Outbox 存储与事务边界的最小必要集合。
//! 订阅者自身的业务失败不属于此处：它们以 `EventFailure` 的形式记录在事件上。
//!
use thiserror::Error;

/// 统一错误类型（基础设施失败与编程错误）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 序列化/主题 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("parse error: {reason}")]
    Parse { reason: String },
    #[error("unknown topic: {name}")]
    UnknownTopic { name: String },
    #[error("topic mismatch: expected={expected}, found={found}")]
    TopicMismatch { expected: String, found: String },

    // --- Outbox 存储 ---
    #[error("duplicate event id: {event_id}")]
    DuplicateEventId { event_id: String },
    #[error("event not found: {event_id}")]
    EventNotFound { event_id: String },
    #[error("outbox repository error: {reason}")]
    OutboxRepository { reason: String },

    // --- 事务 ---
    #[error("unit of work error: {reason}")]
    UnitOfWork { reason: String },
    #[error("database error: {reason}")]
    Database { reason: String },

    // --- 通用 ---
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },
}

impl DomainError {
    pub fn outbox_repository(reason: impl Into<String>) -> Self {
        DomainError::OutboxRepository {
            reason: reason.into(),
        }
    }

    pub fn unit_of_work(reason: impl Into<String>) -> Self {
        DomainError::UnitOfWork {
            reason: reason.into(),
        }
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        DomainError::InvalidState {
            reason: reason.into(),
        }
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;

// ---- Cross-crate conversions for infrastructure convenience ----

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Database {
            reason: err.to_string(),
        }
    }
}

impl From<uuid::Error> for DomainError {
    fn from(err: uuid::Error) -> Self {
        DomainError::Parse {
            reason: err.to_string(),
        }
    }
}

impl From<chrono::ParseError> for DomainError {
    fn from(err: chrono::ParseError) -> Self {
        DomainError::Parse {
            reason: err.to_string(),
        }
    }
}
