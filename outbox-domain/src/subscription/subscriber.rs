//! 订阅者回调
//!
//! 订阅者返回的错误只作为诊断信息记录到事件的失败列表中，
//! 不会传播给发布方，也不会影响同一事件的其他订阅者。
//!
use crate::event::{OutboxEvent, Topic, TopicPayload};
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// 订阅者：处理某一主题的事件
#[async_trait]
pub trait Subscriber<T: Topic>: Send + Sync {
    async fn handle(&self, event: &OutboxEvent<T>) -> anyhow::Result<()>;
}

#[async_trait]
impl<T, S> Subscriber<T> for Arc<S>
where
    T: Topic,
    S: Subscriber<T> + ?Sized,
{
    async fn handle(&self, event: &OutboxEvent<T>) -> anyhow::Result<()> {
        (**self).handle(event).await
    }
}

/// 以异步闭包实现的订阅者，闭包接收事件的拷贝
pub struct FnSubscriber<F> {
    f: F,
}

impl<F> FnSubscriber<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<T, F, Fut> Subscriber<T> for FnSubscriber<F>
where
    T: Topic,
    F: Fn(OutboxEvent<T>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn handle(&self, event: &OutboxEvent<T>) -> anyhow::Result<()> {
        (self.f)(event.clone()).await
    }
}

/// 类型化订阅者：先将载荷解码为 `P`，再交给闭包
///
/// 解码失败同样记为该订阅者的失败。
pub struct PayloadSubscriber<P, F> {
    f: F,
    _payload: PhantomData<fn() -> P>,
}

impl<P, F> PayloadSubscriber<P, F> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _payload: PhantomData,
        }
    }
}

#[async_trait]
impl<T, P, F, Fut> Subscriber<T> for PayloadSubscriber<P, F>
where
    T: Topic,
    P: TopicPayload<Topic = T>,
    F: Fn(P) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn handle(&self, event: &OutboxEvent<T>) -> anyhow::Result<()> {
        let payload = event.payload_as::<P>()?;
        (self.f)(payload).await
    }
}

/// 超时装饰器：超过时限未完成的回调记为失败
pub struct TimeoutSubscriber<S> {
    inner: S,
    timeout: Duration,
}

impl<S> TimeoutSubscriber<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<T, S> Subscriber<T> for TimeoutSubscriber<S>
where
    T: Topic,
    S: Subscriber<T>,
{
    async fn handle(&self, event: &OutboxEvent<T>) -> anyhow::Result<()> {
        match tokio::time::timeout(self.timeout, self.inner.handle(event)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(anyhow::anyhow!(
                "timed out after {}ms",
                self.timeout.as_millis()
            )),
        }
    }
}
