//! 订阅注册表（SubscriptionRegistry）
//!
//! 主题 → { 订阅标识 → 回调 }。每个 `(topic, subscription_id)` 只保留一个回调，
//! 重复订阅覆盖旧回调。注册表显式构建并按引用注入事件总线，没有全局状态；
//! 启动后只读，无需加锁。
//!
use super::{FnSubscriber, PayloadSubscriber, Subscriber, TimeoutSubscriber};
use crate::event::{OutboxEvent, SubscriptionId, Topic, TopicPayload};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub struct SubscriptionRegistry<T: Topic> {
    by_topic: HashMap<T, HashMap<SubscriptionId, Arc<dyn Subscriber<T>>>>,
}

impl<T: Topic> Default for SubscriptionRegistry<T> {
    fn default() -> Self {
        Self {
            by_topic: HashMap::new(),
        }
    }
}

impl<T: Topic> SubscriptionRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册订阅者；同一 `(topic, subscription_id)` 再次注册时替换旧回调
    pub fn subscribe<S>(
        &mut self,
        topic: T,
        subscription_id: impl Into<SubscriptionId>,
        subscriber: S,
    ) -> &mut Self
    where
        S: Subscriber<T> + 'static,
    {
        self.by_topic
            .entry(topic)
            .or_default()
            .insert(subscription_id.into(), Arc::new(subscriber));
        self
    }

    /// 以异步闭包注册
    pub fn subscribe_fn<F, Fut>(
        &mut self,
        topic: T,
        subscription_id: impl Into<SubscriptionId>,
        f: F,
    ) -> &mut Self
    where
        F: Fn(OutboxEvent<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.subscribe(topic, subscription_id, FnSubscriber::new(f))
    }

    /// 以类型化载荷注册，主题取自 `P::TOPIC`
    pub fn subscribe_payload<P, F, Fut>(
        &mut self,
        subscription_id: impl Into<SubscriptionId>,
        f: F,
    ) -> &mut Self
    where
        P: TopicPayload<Topic = T>,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.subscribe(P::TOPIC, subscription_id, PayloadSubscriber::<P, F>::new(f))
    }

    /// 注册带超时的订阅者，超时记为失败
    pub fn subscribe_with_timeout<S>(
        &mut self,
        topic: T,
        subscription_id: impl Into<SubscriptionId>,
        subscriber: S,
        timeout: Duration,
    ) -> &mut Self
    where
        S: Subscriber<T> + 'static,
    {
        self.subscribe(
            topic,
            subscription_id,
            TimeoutSubscriber::new(subscriber, timeout),
        )
    }

    /// 主题当前的订阅者，顺序不作保证
    pub fn subscribers_for(&self, topic: T) -> Vec<(SubscriptionId, Arc<dyn Subscriber<T>>)> {
        self.by_topic
            .get(&topic)
            .map(|subs| {
                subs.iter()
                    .map(|(id, s)| (id.clone(), Arc::clone(s)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn subscription_ids_for(&self, topic: T) -> Vec<SubscriptionId> {
        let mut ids: Vec<SubscriptionId> = self
            .by_topic
            .get(&topic)
            .map(|subs| subs.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.by_topic.values().all(HashMap::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventFactory;
    use outbox_macros::topic;
    use serde::{Deserialize, Serialize};
    use std::sync::Mutex;

    #[topic]
    enum RegistryTopic {
        ConventionSubmitted,
        AgencyUpdated,
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct ConventionSubmitted {
        convention_id: String,
    }

    impl TopicPayload for ConventionSubmitted {
        type Topic = RegistryTopic;
        const TOPIC: RegistryTopic = RegistryTopic::ConventionSubmitted;
    }

    #[test]
    fn resubscribing_same_pair_replaces_callback() {
        let mut registry = SubscriptionRegistry::new();
        registry
            .subscribe_fn(RegistryTopic::ConventionSubmitted, "notify", |_| async {
                anyhow::Ok(())
            })
            .subscribe_fn(RegistryTopic::ConventionSubmitted, "notify", |_| async {
                Err::<(), _>(anyhow::anyhow!("replaced"))
            })
            .subscribe_fn(RegistryTopic::AgencyUpdated, "notify", |_| async { anyhow::Ok(()) });

        assert_eq!(
            registry.subscription_ids_for(RegistryTopic::ConventionSubmitted),
            vec![SubscriptionId::from("notify")]
        );
        assert_eq!(
            registry.subscribers_for(RegistryTopic::AgencyUpdated).len(),
            1
        );
    }

    #[tokio::test]
    async fn replaced_callback_is_the_one_invoked() {
        let mut registry = SubscriptionRegistry::new();
        registry
            .subscribe_fn(RegistryTopic::ConventionSubmitted, "notify", |_| async {
                anyhow::Ok(())
            })
            .subscribe_fn(RegistryTopic::ConventionSubmitted, "notify", |_| async {
                Err::<(), _>(anyhow::anyhow!("replaced"))
            });

        let event = EventFactory::default()
            .create_event()
            .topic(RegistryTopic::ConventionSubmitted)
            .payload(serde_json::Value::Null)
            .call();
        let subs = registry.subscribers_for(RegistryTopic::ConventionSubmitted);

        let err = subs[0].1.handle(&event).await.unwrap_err();
        assert_eq!(err.to_string(), "replaced");
    }

    #[test]
    fn unknown_topic_has_no_subscribers() {
        let registry = SubscriptionRegistry::<RegistryTopic>::new();
        assert!(registry.subscribers_for(RegistryTopic::AgencyUpdated).is_empty());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn payload_subscriber_receives_decoded_payload() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SubscriptionRegistry::new();
        {
            let seen = seen.clone();
            registry.subscribe_payload("record", move |p: ConventionSubmitted| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(p.convention_id);
                    anyhow::Ok(())
                }
            });
        }

        let event = EventFactory::default()
            .event_for(&ConventionSubmitted {
                convention_id: "c-42".into(),
            })
            .unwrap();
        let subs = registry.subscribers_for(RegistryTopic::ConventionSubmitted);
        subs[0].1.handle(&event).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["c-42".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_subscriber_reports_failure() {
        let mut registry = SubscriptionRegistry::new();
        registry.subscribe_with_timeout(
            RegistryTopic::AgencyUpdated,
            "slow",
            FnSubscriber::new(|_: OutboxEvent<RegistryTopic>| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                anyhow::Ok(())
            }),
            Duration::from_millis(250),
        );

        let event = EventFactory::default()
            .create_event()
            .topic(RegistryTopic::AgencyUpdated)
            .payload(serde_json::Value::Null)
            .call();
        let subs = registry.subscribers_for(RegistryTopic::AgencyUpdated);

        let err = subs[0].1.handle(&event).await.unwrap_err();
        assert_eq!(err.to_string(), "timed out after 250ms");
    }
}
