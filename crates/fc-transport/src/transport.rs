//! Publish/Send/Subscribe plus lifecycle (C5), generalized from an earlier
//! `QueueConsumer`/`QueuePublisher`/`EmbeddedQueue` trait set, including its
//! default-method escape hatch for optional capabilities (`defer` delegating
//! to `nack`, `get_metrics` defaulting to `Ok(None)`).

use std::sync::Arc;

use async_trait::async_trait;
use fc_common::HealthState;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;

pub type MessageHandler = Arc<dyn Fn(Vec<u8>) -> BoxFuture<'static, ()> + Send + Sync>;

#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    /// Called once at host startup. Default no-op — a transport that needs
    /// no async setup simply doesn't override this.
    async fn initialize(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>, token: CancellationToken) -> Result<(), TransportError>;

    async fn send(
        &self,
        topic: &str,
        destination: &str,
        payload: Vec<u8>,
        token: CancellationToken,
    ) -> Result<(), TransportError>;

    async fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), TransportError>;

    /// Optional capability: stop accepting new publishes immediately, idempotent.
    /// Default no-op — a transport with no in-flight concept of "accepting"
    /// doesn't need to implement this.
    async fn stop_accepting_messages(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Optional capability: await completion of in-flight work. Default
    /// returns immediately.
    async fn wait_for_completion(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Optional capability: release held resources. Default no-op.
    async fn dispose(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Optional capability: reflect true health. Default `true` — "health
    /// check not supported", callers fall back to
    /// `health_status()`'s default.
    async fn is_healthy(&self) -> bool {
        true
    }

    fn health_status(&self) -> HealthState {
        HealthState::Healthy
    }
}
