//! 业务用例：领域写入与事件在同一工作单元内保存

use crate::topics::{AgencyUpdated, ConventionSignedByBeneficiary, ConventionSubmitted, DemoTopic};
use async_trait::async_trait;
use outbox_application::UseCase;
use outbox_application::context::AppContext;
use outbox_application::error::AppError;
use outbox_domain::event::{EventFactory, EventId};
use outbox_domain::uow::{InMemoryUnitOfWork, UnitOfWork};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConventionStatus {
    ReadyToSign,
    SignedByBeneficiary,
}

/// 业务存储（与 Outbox 同事务）
#[derive(Clone, Default)]
pub struct Stores {
    pub conventions: HashMap<String, ConventionStatus>,
    pub agencies: HashMap<String, String>,
}

pub type DemoUow = InMemoryUnitOfWork<DemoTopic, Stores>;

pub struct SubmitConvention {
    pub factory: Arc<EventFactory<DemoTopic>>,
}

pub struct SubmitConventionInput {
    pub convention_id: String,
    pub beneficiary_email: String,
}

#[async_trait]
impl UseCase<DemoUow> for SubmitConvention {
    const NAME: &'static str = "submit_convention";

    type Input = SubmitConventionInput;
    type Output = EventId;

    fn validate(&self, input: &SubmitConventionInput) -> Result<(), AppError> {
        if !input.beneficiary_email.contains('@') {
            return Err(AppError::Validation(format!(
                "invalid beneficiary email: {}",
                input.beneficiary_email
            )));
        }
        Ok(())
    }

    async fn execute(
        &self,
        uow: &mut DemoUow,
        input: SubmitConventionInput,
        ctx: &AppContext,
    ) -> Result<EventId, AppError> {
        if uow.stores().conventions.contains_key(&input.convention_id) {
            return Err(AppError::Validation(format!(
                "convention {} already submitted",
                input.convention_id
            )));
        }
        uow.stores_mut()
            .conventions
            .insert(input.convention_id.clone(), ConventionStatus::ReadyToSign);

        let event = self.factory.event_for(&ConventionSubmitted {
            convention_id: input.convention_id,
            beneficiary_email: input.beneficiary_email,
            submitted_by: ctx.actor_id.clone(),
        })?;
        uow.outbox_repository().save(&event).await?;
        Ok(*event.id())
    }
}

pub struct SignConvention {
    pub factory: Arc<EventFactory<DemoTopic>>,
}

#[async_trait]
impl UseCase<DemoUow> for SignConvention {
    const NAME: &'static str = "sign_convention";

    type Input = String;
    type Output = EventId;

    async fn execute(
        &self,
        uow: &mut DemoUow,
        convention_id: String,
        _ctx: &AppContext,
    ) -> Result<EventId, AppError> {
        let status = uow
            .stores_mut()
            .conventions
            .get_mut(&convention_id)
            .ok_or_else(|| AppError::NotFound(format!("convention {convention_id}")))?;
        if *status != ConventionStatus::ReadyToSign {
            return Err(AppError::Validation(format!(
                "convention {convention_id} is not ready to sign"
            )));
        }
        *status = ConventionStatus::SignedByBeneficiary;

        let event = self
            .factory
            .event_for(&ConventionSignedByBeneficiary { convention_id })?;
        uow.outbox_repository().save(&event).await?;
        Ok(*event.id())
    }
}

pub struct UpdateAgency {
    pub factory: Arc<EventFactory<DemoTopic>>,
}

#[async_trait]
impl UseCase<DemoUow> for UpdateAgency {
    const NAME: &'static str = "update_agency";

    type Input = AgencyUpdated;
    type Output = EventId;

    async fn execute(
        &self,
        uow: &mut DemoUow,
        input: AgencyUpdated,
        _ctx: &AppContext,
    ) -> Result<EventId, AppError> {
        uow.stores_mut()
            .agencies
            .insert(input.agency_id.clone(), input.name.clone());

        let event = self.factory.event_for(&input)?;
        uow.outbox_repository().save(&event).await?;
        Ok(*event.id())
    }
}
