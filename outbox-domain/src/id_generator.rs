//! 事件标识生成
//!
use crate::event::EventId;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> EventId;
}

/// 随机 UUID v4
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn new_id(&self) -> EventId {
        EventId::from_uuid(Uuid::new_v4())
    }
}

/// 递增序列生成器（测试用，生成 `00000000-0000-0000-0000-000000000001` 形式的 id）
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn new_id(&self) -> EventId {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        EventId::from_uuid(Uuid::from_u128(u128::from(n)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_never_repeat() {
        let generator = SequentialIdGenerator::new();
        let a = generator.new_id();
        let b = generator.new_id();

        assert_ne!(a, b);
        assert_eq!(a.to_string(), "00000000-0000-0000-0000-000000000001");
    }
}
