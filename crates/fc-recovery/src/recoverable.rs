//! A component the supervisor can poll for health and ask to self-heal.
//! Generalized from a single-purpose stuck-row recovery task into an
//! interface any subsystem can implement.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum RecoverableError {
    #[error("recovery attempt failed: {message}")]
    AttemptFailed { message: String },
}

#[async_trait]
pub trait Recoverable: Send + Sync {
    fn component_name(&self) -> &str;

    async fn is_healthy(&self) -> bool;

    async fn recover(&self) -> Result<(), RecoverableError>;
}
