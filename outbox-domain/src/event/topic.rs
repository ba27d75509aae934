use crate::error::{DomainError, DomainResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::hash::Hash;

/// 主题：标识载荷形状的封闭标签
///
/// 一次部署内主题集合在编译期已知，通常由 `#[topic]` 宏在单元变体枚举上生成实现，
/// 保证 `as_str`、`Display` 与 serde 名称一致。
pub trait Topic:
    Copy
    + Eq
    + Hash
    + fmt::Debug
    + fmt::Display
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// 稳定名称（持久化与日志使用）
    fn as_str(&self) -> &'static str;

    /// 按名称查找主题
    fn from_name(name: &str) -> Option<Self>;

    /// 目录中的全部主题
    fn all() -> &'static [Self];

    /// 按名称解析，未知名称返回 `DomainError::UnknownTopic`
    fn parse_name(name: &str) -> DomainResult<Self> {
        Self::from_name(name).ok_or_else(|| DomainError::UnknownTopic {
            name: name.to_string(),
        })
    }
}

/// 载荷形状到主题的显式映射：每个载荷类型只属于一个主题
pub trait TopicPayload: Serialize + DeserializeOwned + Send + Sync + 'static {
    type Topic: Topic;

    const TOPIC: Self::Topic;
}
