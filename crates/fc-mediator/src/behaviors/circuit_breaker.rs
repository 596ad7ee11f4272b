//! Standard priority-700 behavior: Closed/Open/HalfOpen protection around
//! the handler, built around three atomics plus an `RwLock<CircuitState>`
//! rather than a mutex around the whole machine.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fc_common::{MediatorError, MediatorResult, Request};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::behavior::{priority, Behavior, Next};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: 10, success_threshold: 5, reset_timeout: Duration::from_secs(5) }
    }
}

pub struct CircuitBreakerBehavior {
    state: RwLock<CircuitState>,
    failure_count: AtomicU32,
    success_count: AtomicU32,
    last_failure_time: RwLock<Option<Instant>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreakerBehavior {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicU32::new(0),
            success_count: AtomicU32::new(0),
            last_failure_time: RwLock::new(None),
            config,
        }
    }

    pub fn state(&self) -> CircuitState {
        *self.state.read()
    }

    fn allow_request(&self) -> bool {
        let state = *self.state.read();
        match state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if let Some(last_failure) = *self.last_failure_time.read() {
                    if last_failure.elapsed() >= self.config.reset_timeout {
                        *self.state.write() = CircuitState::HalfOpen;
                        self.success_count.store(0, Ordering::SeqCst);
                        debug!("circuit breaker transitioning to half-open");
                        return true;
                    }
                }
                false
            }
            CircuitState::HalfOpen => true,
        }
    }

    fn record_success(&self) {
        match *self.state.read() {
            CircuitState::HalfOpen => {
                let count = self.success_count.fetch_add(1, Ordering::SeqCst) + 1;
                if count >= self.config.success_threshold {
                    *self.state.write() = CircuitState::Closed;
                    self.failure_count.store(0, Ordering::SeqCst);
                    info!(successes = count, "circuit breaker closed");
                }
            }
            CircuitState::Closed => {
                self.failure_count.store(0, Ordering::SeqCst);
            }
            CircuitState::Open => {}
        }
    }

    fn record_failure(&self) {
        match *self.state.read() {
            CircuitState::Closed => {
                let count = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
                if count >= self.config.failure_threshold {
                    *self.state.write() = CircuitState::Open;
                    *self.last_failure_time.write() = Some(Instant::now());
                    warn!(failures = count, "circuit breaker opened");
                }
            }
            CircuitState::HalfOpen => {
                *self.state.write() = CircuitState::Open;
                *self.last_failure_time.write() = Some(Instant::now());
                self.success_count.store(0, Ordering::SeqCst);
                warn!("circuit breaker re-opened on failure while half-open");
            }
            CircuitState::Open => {}
        }
    }
}

impl Default for CircuitBreakerBehavior {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[async_trait]
impl<T: Request> Behavior<T> for CircuitBreakerBehavior {
    fn priority(&self) -> i32 {
        priority::CIRCUIT_BREAKER
    }

    async fn invoke(&self, req: T, token: CancellationToken, next: Next<T>) -> MediatorResult<T::Response> {
        if !self.allow_request() {
            debug!(message_id = %req.message_id(), "circuit breaker open, rejecting request");
            return MediatorResult::failure(MediatorError::TransportFailed {
                message: "circuit breaker open".to_string(),
            });
        }

        let result = next.run(req, token).await;
        if result.is_ok() {
            self.record_success();
        } else {
            self.record_failure();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_failure_threshold_and_half_opens_after_reset_timeout() {
        let breaker = CircuitBreakerBehavior::new(CircuitBreakerConfig {
            failure_threshold: 2,
            success_threshold: 1,
            reset_timeout: Duration::from_millis(10),
        });

        assert!(breaker.allow_request());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow_request());

        std::thread::sleep(Duration::from_millis(15));
        assert!(breaker.allow_request());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
