//! Periodic poll loop over registered `Recoverable` components (C10).
//! Grounded in `RecoveryTask::run`'s `interval` + `MissedTickBehavior::Skip`
//! ticker (`crates/fc-outbox/src/recovery.rs`), generalized from "recover
//! stuck outbox rows" to arbitrary components, and in
//! `LeaderElection`'s `AtomicBool`-guarded single-flight pattern
//! (`crates/fc-standby/src/leader.rs`) for the per-component "already
//! recovering" flag.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use metrics::counter;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::recoverable::Recoverable;

#[derive(Debug, Clone)]
pub struct RecoverySupervisorConfig {
    pub check_interval: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub use_exponential_backoff: bool,
    pub enable_auto_recovery: bool,
}

impl Default for RecoverySupervisorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            max_retries: 5,
            retry_delay: Duration::from_secs(1),
            use_exponential_backoff: true,
            enable_auto_recovery: true,
        }
    }
}

struct ComponentState {
    attempts_remaining: AtomicU32,
    is_recovering: AtomicBool,
    exhausted: AtomicBool,
}

pub struct RecoverySupervisor {
    components: Vec<Arc<dyn Recoverable>>,
    states: DashMap<String, Arc<ComponentState>>,
    config: RecoverySupervisorConfig,
}

impl RecoverySupervisor {
    pub fn new(components: Vec<Arc<dyn Recoverable>>, config: RecoverySupervisorConfig) -> Self {
        Self { components, states: DashMap::new(), config }
    }

    fn state_for(&self, name: &str) -> Arc<ComponentState> {
        self.states
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(ComponentState {
                    attempts_remaining: AtomicU32::new(self.config.max_retries),
                    is_recovering: AtomicBool::new(false),
                    exhausted: AtomicBool::new(false),
                })
            })
            .clone()
    }

    /// Liveness flag: is a recovery attempt for `name` currently in flight.
    pub fn is_recovering(&self, name: &str) -> bool {
        self.states.get(name).map(|s| s.is_recovering.load(Ordering::SeqCst)).unwrap_or(false)
    }

    /// True once a component has burned through `maxRetries` recovery
    /// attempts without reporting healthy again.
    pub fn is_exhausted(&self, name: &str) -> bool {
        self.states.get(name).map(|s| s.exhausted.load(Ordering::SeqCst)).unwrap_or(false)
    }

    pub fn component_names(&self) -> Vec<String> {
        self.components.iter().map(|c| c.component_name().to_string()).collect()
    }

    /// Runs the poll loop until `shutdown` fires. No-op if auto-recovery is
    /// disabled via `enable_auto_recovery`.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enable_auto_recovery {
            info!("recovery supervisor disabled, not polling");
            return;
        }

        let mut ticker = interval(self.config.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_once().await;
                }
                _ = shutdown.recv() => {
                    debug!("recovery supervisor stopped");
                    return;
                }
            }
        }
    }

    /// One poll pass over every registered component. Exposed directly so
    /// tests and `bin/fc-dev` can drive a check without waiting for a tick.
    pub async fn check_once(&self) {
        for component in self.components.clone() {
            let name = component.component_name().to_string();
            if component.is_healthy().await {
                if let Some(state) = self.states.get(&name) {
                    state.attempts_remaining.store(self.config.max_retries, Ordering::SeqCst);
                    state.exhausted.store(false, Ordering::SeqCst);
                }
                continue;
            }
            self.attempt_recovery(component, name).await;
        }
    }

    async fn attempt_recovery(&self, component: Arc<dyn Recoverable>, name: String) {
        let state = self.state_for(&name);
        if state.is_recovering.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut attempt = 0u32;
        loop {
            if state.attempts_remaining.load(Ordering::SeqCst) == 0 {
                warn!(component = %name, "recovery attempts exhausted");
                state.exhausted.store(true, Ordering::SeqCst);
                counter!("recovery.exhausted", "component" => name.clone()).increment(1);
                break;
            }

            match component.recover().await {
                Ok(()) => {
                    info!(component = %name, attempt, "component recovered");
                    counter!("recovery.succeeded", "component" => name.clone()).increment(1);
                    state.attempts_remaining.store(self.config.max_retries, Ordering::SeqCst);
                    state.exhausted.store(false, Ordering::SeqCst);
                    break;
                }
                Err(error) => {
                    state.attempts_remaining.fetch_sub(1, Ordering::SeqCst);
                    counter!("recovery.attempted", "component" => name.clone()).increment(1);
                    error!(component = %name, %error, attempt, "recovery attempt failed");

                    let delay = if self.config.use_exponential_backoff {
                        self.config.retry_delay * 2u32.saturating_pow(attempt.min(10))
                    } else {
                        self.config.retry_delay
                    };
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }

        state.is_recovering.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32 as Counter;

    struct FlakyComponent {
        healthy: AtomicBool,
        recover_calls: Counter,
        succeed_after: u32,
    }

    #[async_trait]
    impl Recoverable for FlakyComponent {
        fn component_name(&self) -> &str {
            "flaky"
        }

        async fn is_healthy(&self) -> bool {
            self.healthy.load(Ordering::SeqCst)
        }

        async fn recover(&self) -> Result<(), crate::recoverable::RecoverableError> {
            let calls = self.recover_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if calls >= self.succeed_after {
                self.healthy.store(true, Ordering::SeqCst);
                Ok(())
            } else {
                Err(crate::recoverable::RecoverableError::AttemptFailed { message: "still down".into() })
            }
        }
    }

    #[tokio::test]
    async fn recovers_after_configured_number_of_attempts() {
        let component = Arc::new(FlakyComponent {
            healthy: AtomicBool::new(false),
            recover_calls: Counter::new(0),
            succeed_after: 3,
        });

        let supervisor = RecoverySupervisor::new(
            vec![component.clone()],
            RecoverySupervisorConfig {
                check_interval: Duration::from_millis(10),
                max_retries: 5,
                retry_delay: Duration::from_millis(1),
                use_exponential_backoff: false,
                enable_auto_recovery: true,
            },
        );

        supervisor.check_once().await;

        assert!(component.is_healthy().await);
        assert!(!supervisor.is_recovering("flaky"));
        assert!(!supervisor.is_exhausted("flaky"));
    }

    #[tokio::test]
    async fn exhausts_after_max_retries_and_marks_unrecovered() {
        let component = Arc::new(FlakyComponent {
            healthy: AtomicBool::new(false),
            recover_calls: Counter::new(0),
            succeed_after: 100,
        });

        let supervisor = RecoverySupervisor::new(
            vec![component.clone()],
            RecoverySupervisorConfig {
                check_interval: Duration::from_millis(10),
                max_retries: 2,
                retry_delay: Duration::from_millis(1),
                use_exponential_backoff: false,
                enable_auto_recovery: true,
            },
        );

        supervisor.check_once().await;

        assert!(!component.is_healthy().await);
        assert!(supervisor.is_exhausted("flaky"));
    }
}
