//! Top-level application wiring: one shared shutdown broadcast driving the
//! transport host, the outbox processor(s), and the recovery supervisor,
//! grounded in `LifecycleManager`'s `broadcast::channel(1)` + per-task
//! `subscribe()` shape and `bin/fc-router/src/main.rs`'s ctrl_c/SIGTERM
//! startup-to-shutdown orchestration.

use std::sync::Arc;

use fc_outbox::OutboxProcessor;
use fc_recovery::RecoverySupervisor;
use fc_transport::TransportError;
use tokio::sync::broadcast;
use tracing::info;

use crate::transport_host::TransportLifecycleHost;

#[derive(Debug, Clone, Default)]
pub struct ApplicationHostConfig {
    pub enable_outbox_processor: bool,
    pub enable_auto_recovery: bool,
}

pub struct ApplicationHost {
    shutdown_tx: broadcast::Sender<()>,
    transport_host: Arc<TransportLifecycleHost>,
    outbox_processors: Vec<Arc<OutboxProcessor>>,
    recovery_supervisor: Option<Arc<RecoverySupervisor>>,
    config: ApplicationHostConfig,
}

impl ApplicationHost {
    pub fn new(
        transport_host: Arc<TransportLifecycleHost>,
        outbox_processors: Vec<Arc<OutboxProcessor>>,
        recovery_supervisor: Option<Arc<RecoverySupervisor>>,
        config: ApplicationHostConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self { shutdown_tx, transport_host, outbox_processors, recovery_supervisor, config }
    }

    /// Initializes transports and spawns the background workers. Returns
    /// once everything is running; does not block on shutdown.
    pub async fn start(&self) -> Result<(), TransportError> {
        self.transport_host.initialize().await?;

        if self.config.enable_outbox_processor {
            for processor in &self.outbox_processors {
                let processor = processor.clone();
                let shutdown_rx = self.shutdown_tx.subscribe();
                tokio::spawn(async move { processor.run(shutdown_rx).await });
            }
        }

        if self.config.enable_auto_recovery {
            if let Some(supervisor) = self.recovery_supervisor.clone() {
                let shutdown_rx = self.shutdown_tx.subscribe();
                tokio::spawn(async move { supervisor.run(shutdown_rx).await });
            }
        }

        info!("application host started");
        Ok(())
    }

    /// `start()`, then blocks until ctrl_c or SIGTERM, then runs the
    /// coordinated shutdown sequence.
    pub async fn run_until_shutdown(&self) -> Result<(), TransportError> {
        self.start().await?;
        self.wait_for_shutdown_signal().await;
        self.shutdown().await;
        Ok(())
    }

    #[cfg(unix)]
    async fn wait_for_shutdown_signal(&self) {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received ctrl-c, shutting down"),
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    async fn wait_for_shutdown_signal(&self) {
        let _ = tokio::signal::ctrl_c().await;
        info!("received ctrl-c, shutting down");
    }

    /// Broadcasts shutdown to every spawned worker, then drains transports.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        self.transport_host.shutdown().await;
    }

    /// Lets callers spawn additional workers onto the same shutdown signal.
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }
}
