//! 事件工厂（EventFactory）
//!
//! 所有需要在工作单元中产生事件的用例统一通过工厂创建事件：
//! 分配新 id、读取时钟作为发生时间、默认状态为 `never-published`，
//! 并对被管理员列入隔离名单的主题默认标记 `was_quarantined`。
//!
use super::{EventPublication, EventStatus, OutboxEvent, Topic, TopicPayload};
use crate::clock::{Clock, SystemClock};
use crate::error::DomainResult;
use crate::id_generator::{IdGenerator, UuidGenerator};
use bon::bon;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

pub struct EventFactory<T: Topic> {
    clock: Arc<dyn Clock>,
    id_generator: Arc<dyn IdGenerator>,
    quarantined_topics: HashSet<T>,
}

#[bon]
impl<T: Topic> EventFactory<T> {
    pub fn new(clock: Arc<dyn Clock>, id_generator: Arc<dyn IdGenerator>) -> Self {
        Self {
            clock,
            id_generator,
            quarantined_topics: HashSet::new(),
        }
    }

    /// 设置被禁止自动投递的主题
    pub fn with_quarantined_topics(mut self, topics: impl IntoIterator<Item = T>) -> Self {
        self.quarantined_topics = topics.into_iter().collect();
        self
    }

    pub fn is_quarantined(&self, topic: T) -> bool {
        self.quarantined_topics.contains(&topic)
    }

    /// 创建事件
    ///
    /// ```ignore
    /// let event = factory
    ///     .create_event()
    ///     .topic(Topic::ConventionSubmitted)
    ///     .payload(json!({ "conventionId": "c-1" }))
    ///     .call();
    /// ```
    #[builder]
    pub fn create_event(
        &self,
        topic: T,
        payload: Value,
        occurred_at: Option<DateTime<Utc>>,
        was_quarantined: Option<bool>,
        #[builder(default)] publications: Vec<EventPublication>,
        status: Option<EventStatus>,
    ) -> OutboxEvent<T> {
        OutboxEvent::from_parts(
            self.id_generator.new_id(),
            topic,
            payload,
            occurred_at.unwrap_or_else(|| self.clock.now()),
            publications,
            status.unwrap_or(EventStatus::NeverPublished),
            was_quarantined.unwrap_or_else(|| self.is_quarantined(topic)),
        )
    }

    /// 由类型化载荷创建事件，主题取自载荷类型
    pub fn event_for<P>(&self, payload: &P) -> DomainResult<OutboxEvent<T>>
    where
        P: TopicPayload<Topic = T>,
    {
        Ok(self
            .create_event()
            .topic(P::TOPIC)
            .payload(serde_json::to_value(payload)?)
            .call())
    }
}

impl<T: Topic> Default for EventFactory<T> {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(UuidGenerator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::id_generator::SequentialIdGenerator;
    use outbox_macros::topic;
    use serde::{Deserialize, Serialize};

    #[topic]
    enum CatalogueTopic {
        ConventionSubmitted,
        #[topic(name = "agency.updated")]
        AgencyUpdated,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct AgencyUpdated {
        agency_id: String,
    }

    impl TopicPayload for AgencyUpdated {
        type Topic = CatalogueTopic;
        const TOPIC: CatalogueTopic = CatalogueTopic::AgencyUpdated;
    }

    fn factory(clock: &FixedClock) -> EventFactory<CatalogueTopic> {
        EventFactory::new(Arc::new(clock.clone()), Arc::new(SequentialIdGenerator::new()))
    }

    #[test]
    fn create_event_defaults() {
        let clock = FixedClock::default();
        let factory = factory(&clock);

        let event = factory
            .create_event()
            .topic(CatalogueTopic::ConventionSubmitted)
            .payload(serde_json::json!({"conventionId": "c-1"}))
            .call();

        assert_eq!(event.status(), EventStatus::NeverPublished);
        assert_eq!(event.occurred_at(), clock.now());
        assert!(event.publications().is_empty());
        assert!(!event.was_quarantined());
    }

    #[test]
    fn create_event_assigns_fresh_ids() {
        let factory = factory(&FixedClock::default());
        let a = factory
            .create_event()
            .topic(CatalogueTopic::ConventionSubmitted)
            .payload(Value::Null)
            .call();
        let b = factory
            .create_event()
            .topic(CatalogueTopic::ConventionSubmitted)
            .payload(Value::Null)
            .call();

        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn quarantined_topics_are_flagged_at_creation() {
        let factory = factory(&FixedClock::default())
            .with_quarantined_topics([CatalogueTopic::AgencyUpdated]);

        let event = factory
            .create_event()
            .topic(CatalogueTopic::AgencyUpdated)
            .payload(Value::Null)
            .call();
        assert!(event.was_quarantined());
        assert_eq!(event.status(), EventStatus::NeverPublished);

        let overridden = factory
            .create_event()
            .topic(CatalogueTopic::AgencyUpdated)
            .payload(Value::Null)
            .was_quarantined(false)
            .call();
        assert!(!overridden.was_quarantined());
    }

    #[test]
    fn typed_payload_round_trips_through_event() {
        let factory = factory(&FixedClock::default());
        let payload = AgencyUpdated {
            agency_id: "agency-1".into(),
        };

        let event = factory.event_for(&payload).unwrap();

        assert_eq!(event.topic(), CatalogueTopic::AgencyUpdated);
        assert_eq!(event.topic().to_string(), "agency.updated");
        assert_eq!(event.payload()["agencyId"], "agency-1");
        assert_eq!(event.payload_as::<AgencyUpdated>().unwrap(), payload);
    }

    #[test]
    fn payload_as_rejects_other_topic() {
        let factory = factory(&FixedClock::default());
        let event = factory
            .create_event()
            .topic(CatalogueTopic::ConventionSubmitted)
            .payload(serde_json::json!({"agencyId": "a"}))
            .call();

        let err = event.payload_as::<AgencyUpdated>().unwrap_err();
        assert!(matches!(err, crate::error::DomainError::TopicMismatch { .. }));
    }
}
