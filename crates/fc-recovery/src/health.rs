//! Health check surface (C12): three aggregators — transport, persistence,
//! recovery — each bounded to complete within 100ms, reporting top-level
//! state plus named sub-reports and an issue list, generalized from
//! HTTP/SQS-specific checks to the framework-level
//! `Transport`/`HealthCheck`/`RecoverySupervisor` abstractions.

use std::sync::Arc;
use std::time::Duration;

use fc_common::{HealthCheck, HealthReport, HealthState};
use fc_transport::Transport;
use tokio::time::timeout;

use crate::supervisor::RecoverySupervisor;

const AGGREGATOR_TIMEOUT: Duration = Duration::from_millis(100);

/// Aggregates health across whatever transports, persistence components,
/// and recovery supervisor the host wires up. Any of the three groups may
/// be empty — an empty group reports healthy.
pub struct HealthAggregator {
    transports: Vec<Arc<dyn Transport>>,
    persistence: Vec<Arc<dyn HealthCheck>>,
    recovery: Option<Arc<RecoverySupervisor>>,
}

impl HealthAggregator {
    pub fn new(
        transports: Vec<Arc<dyn Transport>>,
        persistence: Vec<Arc<dyn HealthCheck>>,
        recovery: Option<Arc<RecoverySupervisor>>,
    ) -> Self {
        Self { transports, persistence, recovery }
    }

    pub async fn check(&self) -> HealthReport {
        let (transport_state, transport_issue) = self.check_transports().await;
        let (persistence_state, persistence_issue) = self.check_persistence().await;
        let (recovery_state, recovery_issue) = self.check_recovery().await;

        let mut report = HealthReport::healthy()
            .with_sub_report("transport", transport_state)
            .with_sub_report("persistence", persistence_state)
            .with_sub_report("recovery", recovery_state);

        for issue in [transport_issue, persistence_issue, recovery_issue].into_iter().flatten() {
            report = report.with_issue(issue);
        }
        report
    }

    async fn check_transports(&self) -> (HealthState, Option<String>) {
        if self.transports.is_empty() {
            return (HealthState::Healthy, None);
        }
        let transports = self.transports.clone();
        match timeout(AGGREGATOR_TIMEOUT, async move {
            let mut worst = HealthState::Healthy;
            for transport in &transports {
                let state = if transport.is_healthy().await { transport.health_status() } else { HealthState::Unhealthy };
                worst = worst.worst(state);
            }
            worst
        })
        .await
        {
            Ok(state) => (state, None),
            Err(_) => (HealthState::Unhealthy, Some("transport health check timed out".to_string())),
        }
    }

    async fn check_persistence(&self) -> (HealthState, Option<String>) {
        if self.persistence.is_empty() {
            return (HealthState::Healthy, None);
        }
        let components = self.persistence.clone();
        match timeout(AGGREGATOR_TIMEOUT, async move {
            let mut worst = HealthState::Healthy;
            for component in &components {
                let state = if component.is_healthy().await { component.health_status() } else { HealthState::Unhealthy };
                worst = worst.worst(state);
            }
            worst
        })
        .await
        {
            Ok(state) => (state, None),
            Err(_) => (HealthState::Unhealthy, Some("persistence health check timed out".to_string())),
        }
    }

    async fn check_recovery(&self) -> (HealthState, Option<String>) {
        let Some(recovery) = &self.recovery else {
            return (HealthState::Healthy, None);
        };
        let names = recovery.component_names();
        let recovery = recovery.clone();
        let names_for_check = names.clone();
        match timeout(AGGREGATOR_TIMEOUT, async move {
            let mut worst = HealthState::Healthy;
            for name in &names_for_check {
                if recovery.is_exhausted(name) {
                    worst = worst.worst(HealthState::Unhealthy);
                } else if recovery.is_recovering(name) {
                    worst = worst.worst(HealthState::Degraded);
                }
            }
            worst
        })
        .await
        {
            Ok(state) => (state, None),
            Err(_) => (HealthState::Unhealthy, Some("recovery health check timed out".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_transport::InMemoryTransport;

    #[tokio::test]
    async fn empty_groups_report_healthy() {
        let aggregator = HealthAggregator::new(vec![], vec![], None);
        let report = aggregator.check().await;
        assert_eq!(report.state, HealthState::Healthy);
    }

    #[tokio::test]
    async fn completes_well_within_the_bounded_timeout() {
        let transport: Arc<dyn Transport> = Arc::new(InMemoryTransport::new("demo"));
        let aggregator = HealthAggregator::new(vec![transport], vec![], None);

        let started = std::time::Instant::now();
        let report = aggregator.check().await;
        assert!(started.elapsed() < AGGREGATOR_TIMEOUT);
        assert_eq!(report.state, HealthState::Healthy);
    }
}
