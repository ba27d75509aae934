use crate::{context::AppContext, error::AppError};
use async_trait::async_trait;
use bon::Builder;
use outbox_domain::event::Topic;
use outbox_domain::uow::UnitOfWorkPerformer;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// 业务用例：在调用方提供的工作单元 `U` 内执行
///
/// 用例内的领域写入与 `outbox_repository().save(..)` 同属一个事务。
#[async_trait]
pub trait UseCase<U>: Send + Sync
where
    U: Send,
{
    const NAME: &'static str;

    type Input: Send + 'static;
    type Output: Send + 'static;

    /// 开启事务前的输入校验
    fn validate(&self, _input: &Self::Input) -> Result<(), AppError> {
        Ok(())
    }

    async fn execute(
        &self,
        uow: &mut U,
        input: Self::Input,
        ctx: &AppContext,
    ) -> Result<Self::Output, AppError>;
}

/// 为每次调用开启一个工作单元：用例成功则提交，否则回滚
#[derive(Builder)]
pub struct TransactionalUseCase<T, UC, P>
where
    T: Topic,
    P: UnitOfWorkPerformer<T>,
    UC: UseCase<P::Uow>,
{
    use_case: Arc<UC>,
    uow_performer: Arc<P>,
    #[builder(skip)]
    _topic: PhantomData<fn() -> T>,
}

impl<T, UC, P> TransactionalUseCase<T, UC, P>
where
    T: Topic,
    P: UnitOfWorkPerformer<T>,
    UC: UseCase<P::Uow> + 'static,
{
    #[tracing::instrument(
        name = "use_case.run",
        skip_all,
        fields(use_case = UC::NAME, correlation_id = ctx.correlation_id.as_deref())
    )]
    pub async fn run(&self, input: UC::Input, ctx: &AppContext) -> Result<UC::Output, AppError> {
        self.use_case.validate(&input)?;

        let use_case = self.use_case.clone();
        let ctx = ctx.clone();
        let result = self
            .uow_performer
            .perform(move |uow| Box::pin(async move { use_case.execute(uow, input, &ctx).await }))
            .await;

        match &result {
            Ok(_) => debug!("use case committed"),
            Err(err) => warn!(error = %err, "use case rolled back"),
        }
        result
    }
}
