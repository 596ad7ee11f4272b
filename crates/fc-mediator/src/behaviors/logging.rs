//! Standard priority-1000 behavior: structured request/response logging.
//! Runs outermost so its timing spans every other behavior in the chain.

use std::time::Instant;

use async_trait::async_trait;
use fc_common::{MediatorResult, Request};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::behavior::{priority, Behavior, Next};

#[derive(Default)]
pub struct LoggingBehavior;

impl LoggingBehavior {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl<T: Request> Behavior<T> for LoggingBehavior {
    fn priority(&self) -> i32 {
        priority::LOGGING
    }

    async fn invoke(&self, req: T, token: CancellationToken, next: Next<T>) -> MediatorResult<T::Response> {
        let message_id = req.message_id();
        let started = Instant::now();
        let result = next.run(req, token).await;
        let elapsed_ms = started.elapsed().as_millis();

        match &result {
            MediatorResult::Ok { .. } => {
                debug!(%message_id, elapsed_ms, "request handled");
            }
            MediatorResult::Err { error, retryable, .. } => {
                warn!(%message_id, elapsed_ms, %error, retryable, "request failed");
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use fc_common::{MediatorError, MessageId};

    use super::*;
    use crate::behavior::BoxFuture;

    #[derive(Clone)]
    struct Echo;

    impl Request for Echo {
        type Response = &'static str;

        fn message_id(&self) -> MessageId {
            MessageId(9)
        }
    }

    #[tokio::test]
    async fn passes_through_success_unchanged() {
        let behavior = LoggingBehavior::new();
        let next = Next::new(|_req: Echo, _token: CancellationToken| -> BoxFuture<'static, MediatorResult<&'static str>> {
            Box::pin(async { MediatorResult::success("ok") })
        });

        let result = behavior.invoke(Echo, CancellationToken::new(), next).await;
        assert_eq!(result.value(), Some(&"ok"));
    }

    #[tokio::test]
    async fn passes_through_failure_unchanged() {
        let behavior = LoggingBehavior::new();
        let next = Next::new(|_req: Echo, _token: CancellationToken| -> BoxFuture<'static, MediatorResult<&'static str>> {
            Box::pin(async { MediatorResult::failure(MediatorError::HandlerFailed { message: "boom".into() }) })
        });

        let result = behavior.invoke(Echo, CancellationToken::new(), next).await;
        assert_eq!(result.error_code(), Some("HandlerFailed"));
    }
}
