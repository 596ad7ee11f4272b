//! Standard priority-900 behavior: reject structurally invalid requests
//! before they reach retry, the circuit breaker, or the handler.

use async_trait::async_trait;
use fc_common::{MediatorError, MediatorResult, Request};
use tokio_util::sync::CancellationToken;

use crate::behavior::{priority, Behavior, Next};

/// Implemented by request types that carry their own validation rule. A
/// request with no useful invariants simply doesn't register this behavior.
pub trait Validatable {
    fn validate(&self) -> Result<(), String>;
}

#[derive(Default)]
pub struct ValidationBehavior;

impl ValidationBehavior {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl<T: Request + Validatable> Behavior<T> for ValidationBehavior {
    fn priority(&self) -> i32 {
        priority::VALIDATION
    }

    async fn invoke(&self, req: T, token: CancellationToken, next: Next<T>) -> MediatorResult<T::Response> {
        if let Err(message) = req.validate() {
            return MediatorResult::failure(MediatorError::ValidationFailed { message });
        }
        next.run(req, token).await
    }
}
