use bon::Builder;

/// 应用层上下文（Application Context）
///
/// 承载一次用例调用的横切信息：
/// - 关联追踪 `correlation_id`；
/// - 执行者 `actor_id`（用户或运维），用例可将其复制到事件载荷中用于审计；
/// - 幂等键 `idempotency_key`：由上层或基础设施决定是否参与幂等。
///
/// ```rust
/// use outbox_application::context::AppContext;
///
/// let ctx = AppContext::builder()
///     .correlation_id("cor-123")
///     .actor_id("ops-1")
///     .build();
/// assert_eq!(ctx.actor_id.as_deref(), Some("ops-1"));
/// ```
#[derive(Clone, Debug, Default, Builder)]
pub struct AppContext {
    #[builder(into)]
    pub correlation_id: Option<String>,
    #[builder(into)]
    pub actor_id: Option<String>,
    #[builder(into)]
    pub idempotency_key: Option<String>,
}
