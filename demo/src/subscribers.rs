//! 订阅者接线：各业务模块在启动时注册 (topic, subscription_id, callback)

use crate::topics::{ConventionSignedByBeneficiary, ConventionSubmitted, DemoTopic};
use async_trait::async_trait;
use outbox_domain::event::OutboxEvent;
use outbox_domain::subscription::{FnSubscriber, Subscriber, SubscriptionRegistry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::info;

/// 模拟不稳定的邮件服务：前 `outage` 次调用失败
pub struct FlakyMailer {
    failures_left: AtomicUsize,
    sent: Mutex<Vec<String>>,
}

impl FlakyMailer {
    pub fn new(outage: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(outage),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Subscriber<DemoTopic> for FlakyMailer {
    async fn handle(&self, event: &OutboxEvent<DemoTopic>) -> anyhow::Result<()> {
        let payload: ConventionSubmitted = event.payload_as()?;

        let in_outage = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if in_outage {
            anyhow::bail!("smtp relay unavailable");
        }

        info!(to = %payload.beneficiary_email, convention_id = %payload.convention_id, "email sent");
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload.beneficiary_email);
        Ok(())
    }
}

pub fn register(registry: &mut SubscriptionRegistry<DemoTopic>, mailer: Arc<FlakyMailer>) {
    registry
        .subscribe(
            DemoTopic::ConventionSubmitted,
            "notify-beneficiary-convention-submitted",
            mailer,
        )
        .subscribe_payload(
            "index-convention-submitted",
            |payload: ConventionSubmitted| async move {
                info!(convention_id = %payload.convention_id, "convention indexed");
                anyhow::Ok(())
            },
        )
        .subscribe_payload(
            "notify-agency-convention-signed",
            |payload: ConventionSignedByBeneficiary| async move {
                info!(convention_id = %payload.convention_id, "agency notified of signature");
                anyhow::Ok(())
            },
        )
        .subscribe_with_timeout(
            DemoTopic::AgencyUpdated,
            "refresh-agency-cache",
            FnSubscriber::new(|event: OutboxEvent<DemoTopic>| async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                info!(event_id = %event.id(), "agency cache refreshed");
                anyhow::Ok(())
            }),
            Duration::from_secs(2),
        );
}
