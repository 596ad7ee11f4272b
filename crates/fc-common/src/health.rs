//! Shared health vocabulary used by transports, stores, and the recovery supervisor.
//!
//! The enum intentionally mirrors the three canonical health states rather than
//! the router's historical `Healthy/Warning/Degraded` — see DESIGN.md's Open
//! Question decision for the reasoning.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthState {
    pub fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Combines two states, keeping the worse of the two.
    pub fn worst(self, other: Self) -> Self {
        use HealthState::*;
        match (self, other) {
            (Unhealthy, _) | (_, Unhealthy) => Unhealthy,
            (Degraded, _) | (_, Degraded) => Degraded,
            (Healthy, Healthy) => Healthy,
        }
    }
}

/// Top-level health state plus named sub-reports: one aggregate state plus
/// an issues list and nested per-component reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub state: HealthState,
    pub issues: Vec<String>,
    pub sub_reports: HashMap<String, HealthState>,
}

impl HealthReport {
    pub fn healthy() -> Self {
        Self { state: HealthState::Healthy, issues: Vec::new(), sub_reports: HashMap::new() }
    }

    pub fn with_sub_report(mut self, name: impl Into<String>, state: HealthState) -> Self {
        self.state = self.state.worst(state);
        self.sub_reports.insert(name.into(), state);
        self
    }

    pub fn with_issue(mut self, issue: impl Into<String>) -> Self {
        self.issues.push(issue.into());
        self
    }
}

/// Health hooks a transport, store, or recoverable component may expose.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn is_healthy(&self) -> bool;

    fn health_status(&self) -> HealthState {
        HealthState::Healthy
    }

    fn last_health_check(&self) -> Option<DateTime<Utc>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worst_picks_the_least_healthy_of_the_pair() {
        use HealthState::*;
        assert_eq!(Healthy.worst(Healthy), Healthy);
        assert_eq!(Healthy.worst(Degraded), Degraded);
        assert_eq!(Degraded.worst(Unhealthy), Unhealthy);
        assert_eq!(Unhealthy.worst(Healthy), Unhealthy);
    }

    #[test]
    fn invariant_10_one_unhealthy_sub_report_drags_the_aggregate_down() {
        let report = HealthReport::healthy()
            .with_sub_report("transport", HealthState::Healthy)
            .with_sub_report("persistence", HealthState::Unhealthy);

        assert_eq!(report.state, HealthState::Unhealthy);
        assert_eq!(report.sub_reports.len(), 2);
    }

    #[test]
    fn all_healthy_sub_reports_keep_the_aggregate_healthy() {
        let report = HealthReport::healthy()
            .with_sub_report("transport", HealthState::Healthy)
            .with_sub_report("recovery", HealthState::Healthy);

        assert!(report.state.is_healthy());
    }
}
