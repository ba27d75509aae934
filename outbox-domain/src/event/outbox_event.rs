use super::{EventFailure, EventId, EventPublication, EventStatus, SubscriptionId, Topic, TopicPayload};
use crate::error::{DomainError, DomainResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// 隔离阈值：累计投递次数（含首次）达到该值且最近一次仍有失败时，事件进入终态
pub const MAX_PUBLICATIONS_BEFORE_QUARANTINE: usize = 4;

/// Outbox 中的事件
///
/// 创建后除 `publications`（只增）与 `status`/`was_quarantined` 外不可变；
/// 重试复用同一个 `id`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxEvent<T> {
    id: EventId,
    topic: T,
    /// 主题相关的结构化数据，对投递引擎不透明
    payload: Value,
    /// 创建时间（而非投递时间）
    occurred_at: DateTime<Utc>,
    /// 按追加顺序排列，不保证按时间有序
    publications: Vec<EventPublication>,
    status: EventStatus,
    was_quarantined: bool,
}

/// 本轮需要执行的订阅者
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionSelection {
    /// 全部订阅者（首次投递或强制重投）
    All,
    /// 仅最近一次投递中失败的订阅者
    Only(HashSet<SubscriptionId>),
}

impl SubscriptionSelection {
    pub fn includes(&self, subscription_id: &SubscriptionId) -> bool {
        match self {
            SubscriptionSelection::All => true,
            SubscriptionSelection::Only(ids) => ids.contains(subscription_id),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, SubscriptionSelection::Only(ids) if ids.is_empty())
    }
}

impl<T: Topic> OutboxEvent<T> {
    pub(crate) fn from_parts(
        id: EventId,
        topic: T,
        payload: Value,
        occurred_at: DateTime<Utc>,
        publications: Vec<EventPublication>,
        status: EventStatus,
        was_quarantined: bool,
    ) -> Self {
        Self {
            id,
            topic,
            payload,
            occurred_at,
            publications,
            status,
            was_quarantined,
        }
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn topic(&self) -> T {
        self.topic
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn publications(&self) -> &[EventPublication] {
        &self.publications
    }

    pub fn status(&self) -> EventStatus {
        self.status
    }

    pub fn was_quarantined(&self) -> bool {
        self.was_quarantined
    }

    /// 将载荷解码为主题对应的类型；主题不匹配时报错
    pub fn payload_as<P>(&self) -> DomainResult<P>
    where
        P: TopicPayload<Topic = T>,
    {
        if P::TOPIC != self.topic {
            return Err(DomainError::TopicMismatch {
                expected: P::TOPIC.as_str().to_string(),
                found: self.topic.as_str().to_string(),
            });
        }
        Ok(serde_json::from_value(self.payload.clone())?)
    }

    /// 最近一次投递：按 `published_at` 取最大值，而非数组末尾
    pub fn latest_publication(&self) -> Option<&EventPublication> {
        self.publications
            .iter()
            .max_by_key(|p| p.published_at())
    }

    /// 本轮需要执行的订阅者
    pub fn subscriptions_to_run(&self) -> SubscriptionSelection {
        if self.status == EventStatus::ToRepublish {
            return SubscriptionSelection::All;
        }

        match self.latest_publication() {
            None => SubscriptionSelection::All,
            Some(latest) => {
                SubscriptionSelection::Only(latest.failed_subscriptions().cloned().collect())
            }
        }
    }

    /// 运维强制全量重投：无视此前成功的订阅者，并解除隔离
    pub fn mark_to_republish(&mut self) {
        self.status = EventStatus::ToRepublish;
        self.was_quarantined = false;
    }

    /// 追加一次投递并推导新状态
    pub(crate) fn record_publication(
        &mut self,
        publication: EventPublication,
        max_publications: usize,
    ) {
        let failed = publication.has_failures();
        self.publications.push(publication);

        self.status = if !failed {
            EventStatus::Published
        } else if self.publications.len() >= max_publications {
            self.was_quarantined = true;
            EventStatus::FailedTooManyTimes
        } else {
            EventStatus::FailedButWillRetry
        };
    }

    /// 最近一次投递的失败列表（无投递时为空）
    pub fn latest_failures(&self) -> &[EventFailure] {
        self.latest_publication()
            .map(EventPublication::failures)
            .unwrap_or_default()
    }

    /// 两条记录是否描述同一次业务发生（不可变字段一致）
    ///
    /// 时间比较精确到微秒，与持久化层的精度一致。
    pub(crate) fn is_same_occurrence(&self, other: &OutboxEvent<T>) -> bool {
        self.id == other.id
            && self.topic == other.topic
            && self.payload == other.payload
            && self.occurred_at.timestamp_micros() == other.occurred_at.timestamp_micros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use outbox_macros::topic;
    use uuid::Uuid;

    #[topic]
    enum TestTopic {
        ConventionSubmitted,
        AgencyUpdated,
    }

    fn day(n: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::days(n)
    }

    fn event_with(publications: Vec<EventPublication>, status: EventStatus) -> OutboxEvent<TestTopic> {
        OutboxEvent::from_parts(
            EventId::from_uuid(Uuid::from_u128(1)),
            TestTopic::ConventionSubmitted,
            serde_json::json!({"conventionId": "c-1"}),
            day(0),
            publications,
            status,
            false,
        )
    }

    fn failed_at(d: i64, ids: &[&str]) -> EventPublication {
        EventPublication::new(
            day(d),
            ids.iter().map(|id| EventFailure::new(*id, "boom")).collect(),
        )
    }

    #[test]
    fn never_published_event_runs_all_subscribers() {
        let event = event_with(vec![], EventStatus::NeverPublished);
        assert_eq!(event.subscriptions_to_run(), SubscriptionSelection::All);
    }

    #[test]
    fn latest_publication_is_selected_by_timestamp_not_position() {
        let event = event_with(
            vec![
                failed_at(1, &["s1"]),
                failed_at(3, &["s3"]),
                EventPublication::succeeded_at(day(2)),
            ],
            EventStatus::FailedButWillRetry,
        );

        assert_eq!(event.latest_publication().unwrap().published_at(), day(3));
        let selection = event.subscriptions_to_run();
        assert!(selection.includes(&SubscriptionId::from("s3")));
        assert!(!selection.includes(&SubscriptionId::from("s1")));
    }

    #[test]
    fn to_republish_runs_all_even_after_success() {
        let mut event = event_with(
            vec![EventPublication::succeeded_at(day(1))],
            EventStatus::Published,
        );
        assert!(event.subscriptions_to_run().is_empty());

        event.mark_to_republish();

        assert_eq!(event.status(), EventStatus::ToRepublish);
        assert_eq!(event.subscriptions_to_run(), SubscriptionSelection::All);
    }

    #[test]
    fn record_publication_quarantines_on_fourth_failed_attempt() {
        let mut event = event_with(vec![], EventStatus::NeverPublished);

        for attempt in 1..=3 {
            event.record_publication(failed_at(attempt, &["s1"]), MAX_PUBLICATIONS_BEFORE_QUARANTINE);
            assert_eq!(event.status(), EventStatus::FailedButWillRetry);
            assert!(!event.was_quarantined());
        }

        event.record_publication(failed_at(4, &["s1"]), MAX_PUBLICATIONS_BEFORE_QUARANTINE);
        assert_eq!(event.status(), EventStatus::FailedTooManyTimes);
        assert!(event.was_quarantined());
        assert_eq!(event.publications().len(), 4);
    }

    #[test]
    fn successful_publication_marks_published() {
        let mut event = event_with(vec![failed_at(1, &["s1"])], EventStatus::FailedButWillRetry);

        event.record_publication(EventPublication::succeeded_at(day(2)), MAX_PUBLICATIONS_BEFORE_QUARANTINE);

        assert_eq!(event.status(), EventStatus::Published);
        assert!(event.latest_failures().is_empty());
    }

    #[test]
    fn persisted_form_uses_topic_and_status_names() {
        let event = event_with(vec![failed_at(1, &["s1"])], EventStatus::FailedButWillRetry);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["topic"], "ConventionSubmitted");
        assert_eq!(json["status"], "failed-but-will-retry");
        assert_eq!(json["wasQuarantined"], false);
        assert_eq!(json["publications"][0]["failures"][0]["subscriptionId"], "s1");
        assert_eq!(json["publications"][0]["failures"][0]["errorMessage"], "boom");

        let back: OutboxEvent<TestTopic> = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
