//! Standard priority-800 behavior: retries a retryable failure from the rest
//! of the chain up to `max_retries` times, waiting `delays[attempt]` between
//! tries. Grounded in `HttpMediatorConfig`'s explicit `retry_delays` table
//! with a fallback for attempts past the configured list.

use std::time::Duration;

use async_trait::async_trait;
use fc_common::{MediatorError, MediatorResult, Request};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::behavior::{priority, Behavior, Next};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub delays: Vec<Duration>,
    pub fallback_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delays: vec![Duration::from_millis(100), Duration::from_millis(300), Duration::from_secs(1)],
            fallback_delay: Duration::from_secs(3),
        }
    }
}

impl RetryConfig {
    fn delay_for(&self, attempt: usize) -> Duration {
        self.delays.get(attempt).copied().unwrap_or(self.fallback_delay)
    }
}

pub struct RetryBehavior {
    config: RetryConfig,
}

impl RetryBehavior {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl Default for RetryBehavior {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

#[async_trait]
impl<T: Request + Clone> Behavior<T> for RetryBehavior {
    fn priority(&self) -> i32 {
        priority::RETRY
    }

    async fn invoke(&self, req: T, token: CancellationToken, next: Next<T>) -> MediatorResult<T::Response> {
        let mut attempt = 0u32;
        loop {
            let result = next.run(req.clone(), token.clone()).await;
            if !result.retryable() || attempt >= self.config.max_retries {
                return result;
            }

            let delay = self.config.delay_for(attempt as usize);
            debug!(message_id = %req.message_id(), attempt, delay_ms = delay.as_millis(), "retrying request");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = token.cancelled() => {
                    debug!(message_id = %req.message_id(), attempt, "retry backoff cancelled");
                    return MediatorResult::failure(MediatorError::Cancelled);
                }
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use fc_common::{MediatorError, MessageId};

    use super::*;
    use crate::behavior::BoxFuture;

    #[derive(Clone)]
    struct Echo;

    impl Request for Echo {
        type Response = &'static str;

        fn message_id(&self) -> MessageId {
            MessageId(1)
        }
    }

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            delays: vec![Duration::from_millis(1)],
            fallback_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn s3_retries_until_success_within_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let behavior = RetryBehavior::new(fast_config(3));
        let calls_handle = calls.clone();
        let next = Next::new(move |_req: Echo, _token: CancellationToken| -> BoxFuture<'static, MediatorResult<&'static str>> {
            let calls = calls_handle.clone();
            Box::pin(async move {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                if attempt < 2 {
                    MediatorResult::failure(MediatorError::PersistenceFailed { message: "down".into() })
                } else {
                    MediatorResult::success("ok")
                }
            })
        });

        let result = behavior.invoke(Echo, CancellationToken::new(), next).await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_failure_returns_after_one_invocation() {
        let calls = Arc::new(AtomicU32::new(0));
        let behavior = RetryBehavior::new(fast_config(3));
        let calls_handle = calls.clone();
        let next = Next::new(move |_req: Echo, _token: CancellationToken| -> BoxFuture<'static, MediatorResult<&'static str>> {
            calls_handle.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { MediatorResult::failure(MediatorError::ValidationFailed { message: "bad".into() }) })
        });

        let result = behavior.invoke(Echo, CancellationToken::new(), next).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invariant_5_retry_terminates_after_max_retries_plus_one_invocations() {
        let calls = Arc::new(AtomicU32::new(0));
        let behavior = RetryBehavior::new(fast_config(3));
        let calls_handle = calls.clone();
        let next = Next::new(move |_req: Echo, _token: CancellationToken| -> BoxFuture<'static, MediatorResult<&'static str>> {
            calls_handle.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { MediatorResult::failure(MediatorError::TransportFailed { message: "down".into() }) })
        });

        let result = behavior.invoke(Echo, CancellationToken::new(), next).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn cancelling_during_backoff_aborts_with_cancelled() {
        let calls = Arc::new(AtomicU32::new(0));
        let config = RetryConfig {
            max_retries: 5,
            delays: vec![Duration::from_secs(30)],
            fallback_delay: Duration::from_secs(30),
        };
        let behavior = RetryBehavior::new(config);
        let calls_handle = calls.clone();
        let next = Next::new(move |_req: Echo, _token: CancellationToken| -> BoxFuture<'static, MediatorResult<&'static str>> {
            calls_handle.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { MediatorResult::failure(MediatorError::TransportFailed { message: "down".into() }) })
        });

        let token = CancellationToken::new();
        let token_handle = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            token_handle.cancel();
        });

        let result = behavior.invoke(Echo, token, next).await;

        assert_eq!(result.error_code(), Some("Cancelled"));
        assert_eq!(calls.load(Ordering::SeqCst), 1, "only the first attempt ran before backoff was cancelled");
    }
}
