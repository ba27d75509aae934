//! 运维强制重投
//!
//! 将事件置为 `to-republish` 并解除隔离；下一次投递会重新运行该主题的全部订阅者。
//!
use crate::{context::AppContext, error::AppError, use_case::UseCase};
use async_trait::async_trait;
use outbox_domain::event::{EventId, OutboxEvent, Topic};
use outbox_domain::uow::UnitOfWork;
use std::marker::PhantomData;
use tracing::info;

pub struct MarkEventForRepublish<T> {
    _topic: PhantomData<fn() -> T>,
}

impl<T> MarkEventForRepublish<T> {
    pub fn new() -> Self {
        Self {
            _topic: PhantomData,
        }
    }
}

impl<T> Default for MarkEventForRepublish<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T, U> UseCase<U> for MarkEventForRepublish<T>
where
    T: Topic,
    U: UnitOfWork<T>,
{
    const NAME: &'static str = "mark_event_for_republish";

    type Input = EventId;
    type Output = OutboxEvent<T>;

    async fn execute(
        &self,
        uow: &mut U,
        event_id: EventId,
        ctx: &AppContext,
    ) -> Result<OutboxEvent<T>, AppError> {
        let outbox = uow.outbox_repository();
        let mut event = outbox
            .get_by_id(&event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("event {event_id}")))?;

        let previous = event.status();
        event.mark_to_republish();
        outbox.save(&event).await?;

        info!(
            %event_id,
            topic = %event.topic(),
            %previous,
            actor_id = ctx.actor_id.as_deref(),
            "event marked for republish"
        );
        Ok(event)
    }
}
