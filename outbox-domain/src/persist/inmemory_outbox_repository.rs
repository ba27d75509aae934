//! 内存版 Outbox 存储
//!
//! 克隆得到一份独立副本（深拷贝），内存工作单元借此实现提交/回滚。
//!
use super::outbox_repository::ensure_same_occurrence;
use crate::error::DomainResult as Result;
use crate::event::{EventId, EventStatus, OutboxEvent, Topic};
use crate::persist::OutboxRepository;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

#[derive(Clone)]
pub struct InMemoryOutboxRepository<T: Topic> {
    events: DashMap<EventId, OutboxEvent<T>>,
}

impl<T: Topic> Default for InMemoryOutboxRepository<T> {
    fn default() -> Self {
        Self {
            events: DashMap::new(),
        }
    }
}

impl<T: Topic> InMemoryOutboxRepository<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全部事件，按 `occurred_at` 升序
    pub fn all_events(&self) -> Vec<OutboxEvent<T>> {
        let mut events: Vec<OutboxEvent<T>> =
            self.events.iter().map(|e| e.value().clone()).collect();
        sort_by_occurrence(&mut events);
        events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

fn sort_by_occurrence<T: Topic>(events: &mut [OutboxEvent<T>]) {
    events.sort_by(|a, b| {
        a.occurred_at()
            .cmp(&b.occurred_at())
            .then_with(|| a.id().cmp(b.id()))
    });
}

#[async_trait]
impl<T: Topic> OutboxRepository<T> for InMemoryOutboxRepository<T> {
    async fn save(&self, event: &OutboxEvent<T>) -> Result<()> {
        match self.events.entry(*event.id()) {
            Entry::Occupied(mut existing) => {
                ensure_same_occurrence(existing.get(), event)?;
                existing.insert(event.clone());
            }
            Entry::Vacant(slot) => {
                slot.insert(event.clone());
            }
        }
        Ok(())
    }

    async fn get_by_id(&self, id: &EventId) -> Result<Option<OutboxEvent<T>>> {
        Ok(self.events.get(id).map(|e| e.value().clone()))
    }

    async fn find_by_status(&self, statuses: &[EventStatus]) -> Result<Vec<OutboxEvent<T>>> {
        let mut events: Vec<OutboxEvent<T>> = self
            .events
            .iter()
            .filter(|e| statuses.contains(&e.value().status()))
            .map(|e| e.value().clone())
            .collect();
        sort_by_occurrence(&mut events);
        Ok(events)
    }
}
