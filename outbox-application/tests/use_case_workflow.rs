use async_trait::async_trait;
use outbox_application::context::AppContext;
use outbox_application::error::AppError;
use outbox_application::{MarkEventForRepublish, TransactionalUseCase, UseCase};
use outbox_domain::clock::FixedClock;
use outbox_domain::error::DomainError;
use outbox_domain::event::{EventFactory, EventId, EventStatus, OutboxEvent, TopicPayload};
use outbox_domain::eventing::EventBus;
use outbox_domain::id_generator::SequentialIdGenerator;
use outbox_domain::persist::OutboxRepository;
use outbox_domain::subscription::SubscriptionRegistry;
use outbox_domain::uow::{InMemoryUnitOfWork, InMemoryUnitOfWorkPerformer, UnitOfWork};
use outbox_macros::topic;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[topic]
enum AppTopic {
    ConventionSubmitted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConventionSubmitted {
    convention_id: String,
    submitted_by: Option<String>,
}

impl TopicPayload for ConventionSubmitted {
    type Topic = AppTopic;
    const TOPIC: AppTopic = AppTopic::ConventionSubmitted;
}

#[derive(Clone, Default)]
struct Stores {
    conventions: HashMap<String, String>,
}

type Uow = InMemoryUnitOfWork<AppTopic, Stores>;
type Performer = InMemoryUnitOfWorkPerformer<AppTopic, Stores>;

struct SubmitConvention {
    factory: EventFactory<AppTopic>,
}

#[async_trait]
impl UseCase<Uow> for SubmitConvention {
    const NAME: &'static str = "submit_convention";

    type Input = String;
    type Output = EventId;

    fn validate(&self, convention_id: &String) -> Result<(), AppError> {
        if convention_id.trim().is_empty() {
            return Err(AppError::Validation("convention id is required".into()));
        }
        Ok(())
    }

    async fn execute(
        &self,
        uow: &mut Uow,
        convention_id: String,
        ctx: &AppContext,
    ) -> Result<EventId, AppError> {
        if uow.stores().conventions.contains_key(&convention_id) {
            return Err(DomainError::invalid_state("convention already submitted").into());
        }
        uow.stores_mut()
            .conventions
            .insert(convention_id.clone(), "READY_TO_SIGN".into());

        let event = self.factory.event_for(&ConventionSubmitted {
            convention_id,
            submitted_by: ctx.actor_id.clone(),
        })?;
        uow.outbox_repository().save(&event).await?;
        Ok(*event.id())
    }
}

struct Fixture {
    performer: Arc<Performer>,
    submit: TransactionalUseCase<AppTopic, SubmitConvention, Performer>,
    republish: TransactionalUseCase<AppTopic, MarkEventForRepublish<AppTopic>, Performer>,
}

impl Fixture {
    fn new() -> Self {
        let performer = Arc::new(Performer::new());
        let factory = EventFactory::new(
            Arc::new(FixedClock::default()),
            Arc::new(SequentialIdGenerator::new()),
        );
        Self {
            submit: TransactionalUseCase::builder()
                .use_case(Arc::new(SubmitConvention { factory }))
                .uow_performer(performer.clone())
                .build(),
            republish: TransactionalUseCase::builder()
                .use_case(Arc::new(MarkEventForRepublish::new()))
                .uow_performer(performer.clone())
                .build(),
            performer,
        }
    }

    async fn stored(&self, id: &EventId) -> Option<OutboxEvent<AppTopic>> {
        self.performer
            .snapshot()
            .await
            .outbox()
            .get_by_id(id)
            .await
            .unwrap()
    }
}

fn operator() -> AppContext {
    AppContext::builder()
        .correlation_id("cor-1")
        .actor_id("ops-1")
        .build()
}

#[tokio::test]
async fn use_case_commits_mutation_and_event_together() {
    let fx = Fixture::new();

    let id = fx.submit.run("c-1".to_string(), &operator()).await.unwrap();

    let snapshot = fx.performer.snapshot().await;
    assert_eq!(snapshot.stores().conventions["c-1"], "READY_TO_SIGN");
    let event = fx.stored(&id).await.unwrap();
    assert_eq!(event.status(), EventStatus::NeverPublished);
    let payload: ConventionSubmitted = event.payload_as().unwrap();
    assert_eq!(payload.submitted_by.as_deref(), Some("ops-1"));
}

#[tokio::test]
async fn validation_failure_never_opens_a_transaction() {
    let fx = Fixture::new();

    let err = fx.submit.run("  ".to_string(), &operator()).await.unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert!(fx.performer.events().await.is_empty());
}

#[tokio::test]
async fn failing_use_case_rolls_back_every_write() {
    let fx = Fixture::new();
    fx.submit.run("c-1".to_string(), &operator()).await.unwrap();

    let err = fx.submit.run("c-1".to_string(), &operator()).await.unwrap_err();

    assert!(matches!(
        err,
        AppError::Domain(DomainError::InvalidState { .. })
    ));
    assert_eq!(fx.performer.events().await.len(), 1);
}

#[tokio::test]
async fn republish_of_unknown_event_is_not_found() {
    let fx = Fixture::new();

    let unknown: EventId = "00000000-0000-0000-0000-00000000ffff".parse().unwrap();

    let err = fx.republish.run(unknown, &operator()).await.unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn republish_lifts_quarantine_and_reruns_every_subscriber() {
    let fx = Fixture::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = SubscriptionRegistry::new();
    {
        let calls = calls.clone();
        registry.subscribe_payload("archive", move |_: ConventionSubmitted| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok(())
            }
        });
    }
    registry.subscribe_fn(AppTopic::ConventionSubmitted, "mailer", |_| async {
        Err::<(), _>(anyhow::anyhow!("smtp unavailable"))
    });
    let bus = EventBus::builder()
        .registry(Arc::new(registry))
        .uow_performer(fx.performer.clone())
        .build();

    let id = fx.submit.run("c-1".to_string(), &operator()).await.unwrap();
    let mut event = fx.stored(&id).await.unwrap();
    for _ in 0..4 {
        event = bus.publish(event).await.unwrap();
    }
    assert_eq!(event.status(), EventStatus::FailedTooManyTimes);
    assert!(event.was_quarantined());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let marked = fx.republish.run(id, &operator()).await.unwrap();

    assert_eq!(marked.status(), EventStatus::ToRepublish);
    assert!(!marked.was_quarantined());
    assert_eq!(fx.stored(&id).await.unwrap(), marked);

    let event = bus.publish(marked).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(event.publications().len(), 5);
    assert_eq!(event.status(), EventStatus::FailedTooManyTimes);
}
