//! Drives every registered `Transport` through initialize → (stop-accepting →
//! wait-for-completion, bounded by `shutdownTimeout` → dispose) (C11).
//! Optional-capability methods on `Transport` already default to no-ops, so
//! this host never needs to ask whether a transport supports a given step.

use std::sync::Arc;
use std::time::Duration;

use fc_transport::Transport;
use metrics::counter;
use tokio::time::timeout;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct TransportLifecycleHostConfig {
    pub shutdown_timeout: Duration,
    pub enable_transport_hosting: bool,
}

impl Default for TransportLifecycleHostConfig {
    fn default() -> Self {
        Self { shutdown_timeout: Duration::from_secs(30), enable_transport_hosting: true }
    }
}

pub struct TransportLifecycleHost {
    transports: Vec<Arc<dyn Transport>>,
    config: TransportLifecycleHostConfig,
}

impl TransportLifecycleHost {
    pub fn new(transports: Vec<Arc<dyn Transport>>, config: TransportLifecycleHostConfig) -> Self {
        Self { transports, config }
    }

    pub async fn initialize(&self) -> Result<(), fc_transport::TransportError> {
        if !self.config.enable_transport_hosting {
            return Ok(());
        }
        for transport in &self.transports {
            debug!(transport = transport.name(), "initializing transport");
            transport.initialize().await?;
        }
        Ok(())
    }

    /// stop-accepting → wait-for-completion (bounded) → dispose, run over
    /// every transport. A transport that doesn't drain within
    /// `shutdownTimeout` is force-disposed anyway and counted as a forced
    /// shutdown rather than left to block the process.
    pub async fn shutdown(&self) {
        if !self.config.enable_transport_hosting {
            return;
        }

        for transport in &self.transports {
            if let Err(error) = transport.stop_accepting_messages().await {
                warn!(transport = transport.name(), %error, "failed to stop accepting messages");
            }
        }

        for transport in &self.transports {
            match timeout(self.config.shutdown_timeout, transport.wait_for_completion()).await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => warn!(transport = transport.name(), %error, "transport drain reported an error"),
                Err(_) => {
                    warn!(
                        transport = transport.name(),
                        timeout_ms = self.config.shutdown_timeout.as_millis(),
                        "forced shutdown: transport did not drain within shutdownTimeout"
                    );
                    counter!("host.shutdown.forced", "transport" => transport.name().to_string()).increment(1);
                }
            }
        }

        for transport in &self.transports {
            if let Err(error) = transport.dispose().await {
                warn!(transport = transport.name(), %error, "transport dispose failed");
            }
        }

        info!("transport lifecycle host shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_transport::InMemoryTransport;

    #[tokio::test]
    async fn shutdown_sequence_completes_for_a_healthy_transport() {
        let transport: Arc<dyn Transport> = Arc::new(InMemoryTransport::new("demo"));
        let host = TransportLifecycleHost::new(vec![transport.clone()], TransportLifecycleHostConfig::default());

        host.initialize().await.unwrap();
        host.shutdown().await;

        let rejected = transport.publish("topic", vec![1], tokio_util::sync::CancellationToken::new()).await;
        assert!(rejected.is_err());
    }

    #[tokio::test]
    async fn disabled_hosting_is_a_no_op() {
        let transport: Arc<dyn Transport> = Arc::new(InMemoryTransport::new("demo"));
        let host = TransportLifecycleHost::new(
            vec![transport.clone()],
            TransportLifecycleHostConfig { enable_transport_hosting: false, ..TransportLifecycleHostConfig::default() },
        );

        host.shutdown().await;
        // still accepting: shutdown never reached stop_accepting_messages
        assert!(transport.publish("topic", vec![1], tokio_util::sync::CancellationToken::new()).await.is_ok());
    }
}
