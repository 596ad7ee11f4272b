//! The pipeline abstraction: a `Behavior` wraps the rest of the chain via a
//! `Next` continuation it may call zero, one, or (for `RetryBehavior`
//! specifically) several times.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use fc_common::{MediatorResult, Request};
use tokio_util::sync::CancellationToken;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The rest of the chain beyond the behavior holding it. Reusable (`Fn`, not
/// `FnOnce`) because `RetryBehavior` needs to invoke it more than once.
#[derive(Clone)]
pub struct Next<T: Request> {
    inner: Arc<dyn Fn(T, CancellationToken) -> BoxFuture<'static, MediatorResult<T::Response>> + Send + Sync>,
}

impl<T: Request> Next<T> {
    pub fn new(
        inner: impl Fn(T, CancellationToken) -> BoxFuture<'static, MediatorResult<T::Response>> + Send + Sync + 'static,
    ) -> Self {
        Self { inner: Arc::new(inner) }
    }

    pub async fn run(&self, req: T, token: CancellationToken) -> MediatorResult<T::Response> {
        (self.inner)(req, token).await
    }
}

/// A single pipeline stage, composed around a request type at registration
/// time. A behavior must never mutate the request it passes to `next` and
/// must forward `token` to `next.run` unchanged so downstream behaviors,
/// the handler, and any transport/store call they make observe the same
/// cancellation signal.
#[async_trait]
pub trait Behavior<T: Request>: Send + Sync {
    /// Higher runs outermost. See `priority` for the standard scale.
    fn priority(&self) -> i32;

    async fn invoke(&self, req: T, token: CancellationToken, next: Next<T>) -> MediatorResult<T::Response>;
}

/// Standard priority scale a registered pipeline is ordered by.
pub mod priority {
    pub const LOGGING: i32 = 1000;
    pub const VALIDATION: i32 = 900;
    /// Sits outside retry so it only sees the chain's final, post-retry
    /// outcome rather than enqueueing on every intermediate attempt.
    pub const DEAD_LETTER: i32 = 850;
    pub const RETRY: i32 = 800;
    pub const CIRCUIT_BREAKER: i32 = 700;
    pub const IDEMPOTENCY: i32 = 600;
    pub const CUSTOM: i32 = 500;
    pub const OUTBOX: i32 = 400;
}
