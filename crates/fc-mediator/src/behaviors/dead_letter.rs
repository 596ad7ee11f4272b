//! Reliability behavior: on a terminal failure (non-retryable, or retryable
//! but every retry attempt exhausted), enqueues `{request, lastResult}` to a
//! dead-letter sink while still returning the failure to the caller
//! unchanged — dead-lettering is an observability side effect, never a
//! substitute for surfacing the error.
//!
//! Registered at `priority::DEAD_LETTER`, outside `RetryBehavior`, so it only
//! runs once per `send` call on the chain's final outcome.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fc_common::{MediatorError, MediatorResult, Request};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::behavior::{priority, Behavior, Next};

#[derive(Debug, Clone)]
pub struct DeadLetterEntry<T> {
    pub request: T,
    pub error: MediatorError,
    pub recorded_at: DateTime<Utc>,
}

#[async_trait]
pub trait DeadLetterSink<T>: Send + Sync {
    async fn enqueue(&self, entry: DeadLetterEntry<T>);
}

/// Reference in-memory sink: a `parking_lot::Mutex`-guarded `Vec`, the usual
/// shape for an ordered in-memory log with no eviction policy.
pub struct InMemoryDeadLetterSink<T> {
    entries: Mutex<Vec<DeadLetterEntry<T>>>,
}

impl<T> Default for InMemoryDeadLetterSink<T> {
    fn default() -> Self {
        Self { entries: Mutex::new(Vec::new()) }
    }
}

impl<T: Clone> InMemoryDeadLetterSink<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<DeadLetterEntry<T>> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl<T: Send + Sync + Clone> DeadLetterSink<T> for InMemoryDeadLetterSink<T> {
    async fn enqueue(&self, entry: DeadLetterEntry<T>) {
        self.entries.lock().push(entry);
    }
}

pub struct DeadLetterBehavior<T: Request> {
    sink: Arc<dyn DeadLetterSink<T>>,
    _marker: PhantomData<fn(T)>,
}

impl<T: Request> DeadLetterBehavior<T> {
    pub fn new(sink: Arc<dyn DeadLetterSink<T>>) -> Self {
        Self { sink, _marker: PhantomData }
    }
}

#[async_trait]
impl<T: Request + Clone> Behavior<T> for DeadLetterBehavior<T> {
    fn priority(&self) -> i32 {
        priority::DEAD_LETTER
    }

    async fn invoke(&self, req: T, token: CancellationToken, next: Next<T>) -> MediatorResult<T::Response> {
        let result = next.run(req.clone(), token).await;
        if let MediatorResult::Err { error, .. } = &result {
            warn!(message_id = %req.message_id(), %error, "dead-lettering request");
            self.sink
                .enqueue(DeadLetterEntry {
                    request: req,
                    error: error.clone(),
                    recorded_at: Utc::now(),
                })
                .await;
        }
        result
    }
}
