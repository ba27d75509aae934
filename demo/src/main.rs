mod config;
mod subscribers;
mod topics;
mod use_cases;

use anyhow::{Context, Result};
use config::Config;
use outbox_application::context::AppContext;
use outbox_application::{MarkEventForRepublish, TransactionalUseCase, UseCase};
use outbox_domain::event::{EventFactory, EventStatus, Topic};
use outbox_domain::eventing::{EventBus, EventCrawler};
use outbox_domain::subscription::SubscriptionRegistry;
use outbox_domain::uow::InMemoryUnitOfWorkPerformer;
use std::sync::Arc;
use subscribers::FlakyMailer;
use topics::{AgencyUpdated, DemoTopic};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use use_cases::{
    DemoUow, SignConvention, Stores, SubmitConvention, SubmitConventionInput, UpdateAgency,
};

type Performer = InMemoryUnitOfWorkPerformer<DemoTopic, Stores>;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config);

    info!(
        new_events_interval_ms = config.crawler.new_events_interval.as_millis() as u64,
        failed_events_interval_ms = config.crawler.failed_events_interval.as_millis() as u64,
        max_events_in_parallel = config.crawler.max_events_in_parallel,
        quarantined_topics = ?config.quarantined_topics,
        "Configuration loaded"
    );

    let quarantined = config
        .quarantined_topics
        .iter()
        .map(|name| DemoTopic::parse_name(name))
        .collect::<Result<Vec<_>, _>>()
        .context("OUTBOX_QUARANTINED_TOPICS contains an unknown topic")?;

    let performer = Arc::new(Performer::new());
    let factory = Arc::new(EventFactory::default().with_quarantined_topics(quarantined));

    let mailer = Arc::new(FlakyMailer::new(2));
    let mut registry = SubscriptionRegistry::new();
    subscribers::register(&mut registry, mailer.clone());

    let bus = Arc::new(
        EventBus::builder()
            .registry(Arc::new(registry))
            .uow_performer(performer.clone())
            .build(),
    );
    let crawler = Arc::new(
        EventCrawler::builder()
            .event_bus(bus)
            .uow_performer(performer.clone())
            .config(config.crawler)
            .build(),
    );

    let ctx = AppContext::builder()
        .correlation_id("demo-run")
        .actor_id("demo")
        .build();
    seed(&performer, &factory, &ctx).await?;

    let handle = crawler.clone().start();
    match config.run_for {
        Some(run_for) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Ctrl-C received"),
                _ = tokio::time::sleep(run_for) => info!("run duration elapsed"),
            }
        }
        None => {
            tokio::signal::ctrl_c().await?;
            info!("Ctrl-C received");
        }
    }
    handle.shutdown();
    handle.join().await;

    // 运维：被隔离的事件强制重投一次
    let republish = transactional(MarkEventForRepublish::<DemoTopic>::new(), &performer);
    for event in performer.events().await {
        if event.status() == EventStatus::FailedTooManyTimes {
            warn!(event_id = %event.id(), topic = %event.topic(), "quarantined event, forcing republish");
            republish.run(*event.id(), &ctx).await?;
        }
    }
    let report = crawler.tick().await?;
    info!(?report, "final crawl");

    for event in performer.events().await {
        info!(
            event_id = %event.id(),
            topic = event.topic().as_str(),
            status = %event.status(),
            attempts = event.publications().len(),
            was_quarantined = event.was_quarantined(),
            "outbox"
        );
    }
    info!(sent = ?mailer.sent(), "emails");

    Ok(())
}

fn transactional<UC>(
    use_case: UC,
    performer: &Arc<Performer>,
) -> TransactionalUseCase<DemoTopic, UC, Performer>
where
    UC: UseCase<DemoUow> + 'static,
{
    TransactionalUseCase::builder()
        .use_case(Arc::new(use_case))
        .uow_performer(performer.clone())
        .build()
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into());

    if config.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn seed(
    performer: &Arc<Performer>,
    factory: &Arc<EventFactory<DemoTopic>>,
    ctx: &AppContext,
) -> Result<()> {
    let submit = transactional(
        SubmitConvention {
            factory: factory.clone(),
        },
        performer,
    );
    let sign = transactional(
        SignConvention {
            factory: factory.clone(),
        },
        performer,
    );
    let update_agency = transactional(
        UpdateAgency {
            factory: factory.clone(),
        },
        performer,
    );

    for (convention_id, email) in [("conv-1", "ada@example.org"), ("conv-2", "alan@example.org")] {
        submit
            .run(
                SubmitConventionInput {
                    convention_id: convention_id.to_string(),
                    beneficiary_email: email.to_string(),
                },
                ctx,
            )
            .await?;
    }
    sign.run("conv-1".to_string(), ctx).await?;
    update_agency
        .run(
            AgencyUpdated {
                agency_id: "agency-1".to_string(),
                name: "Pôle emploi Lyon".to_string(),
            },
            ctx,
        )
        .await?;

    // 重复提交被拒绝，事务回滚，不留下事件
    if let Err(err) = submit
        .run(
            SubmitConventionInput {
                convention_id: "conv-1".to_string(),
                beneficiary_email: "ada@example.org".to_string(),
            },
            ctx,
        )
        .await
    {
        warn!(error = %err, "duplicate submission rejected");
    }

    info!(events = performer.events().await.len(), "use cases committed");
    Ok(())
}
