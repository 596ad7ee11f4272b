//! Background worker draining `OutboxStore` into a `Transport`.
//!
//! Poll loop shape carried over from an earlier `OutboxProcessor::start`/
//! `process_batch` design, with its `interval` + `MissedTickBehavior::Skip`
//! ticker, but with the old bespoke `sleep`-loop replaced by `tokio::select!`
//! over a shutdown broadcast so the processor can drain cooperatively
//! instead of being aborted mid-batch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fc_store::{OutboxRow, OutboxStore};
use fc_transport::Transport;
use metrics::{counter, histogram};
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, warn};

#[derive(Debug, Clone)]
pub struct OutboxProcessorConfig {
    pub scan_interval: Duration,
    pub batch_size: usize,
    /// Extra backoff applied after a batch with at least one publish failure.
    pub error_delay: Duration,
    /// When a shutdown signal arrives mid-scan, finish draining the batch
    /// already in flight rather than abandoning it.
    pub complete_current_batch_on_shutdown: bool,
    /// Attempts a row may fail before it's marked terminally `Failed`
    /// instead of being retried on the next scan.
    pub max_attempts: u32,
}

impl Default for OutboxProcessorConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(1),
            batch_size: 50,
            error_delay: Duration::from_secs(5),
            complete_current_batch_on_shutdown: true,
            max_attempts: 5,
        }
    }
}

pub struct OutboxProcessor {
    store: Arc<dyn OutboxStore>,
    transport: Arc<dyn Transport>,
    config: OutboxProcessorConfig,
}

impl OutboxProcessor {
    pub fn new(store: Arc<dyn OutboxStore>, transport: Arc<dyn Transport>, config: OutboxProcessorConfig) -> Self {
        Self { store, transport, config }
    }

    /// Runs until `shutdown` fires. At most one batch is ever in flight.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        debug!(
            scan_interval_ms = self.config.scan_interval.as_millis(),
            batch_size = self.config.batch_size,
            "starting outbox processor"
        );

        let mut ticker = interval(self.config.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.process_batch().await;
                }
                _ = shutdown.recv() => {
                    if self.config.complete_current_batch_on_shutdown {
                        self.process_batch().await;
                    }
                    debug!("outbox processor stopped");
                    return;
                }
            }
        }
    }

    async fn process_batch(&self) {
        let pending: Vec<OutboxRow> = match self.store.get_pending(self.config.batch_size).await {
            Ok(rows) => rows,
            Err(error) => {
                error!(%error, "failed to read pending outbox rows");
                return;
            }
        };

        if pending.is_empty() {
            return;
        }

        let started = Instant::now();
        let mut any_failed = false;

        for row in pending {
            // The processor drives its own shutdown via the broadcast signal
            // in `run`, so each publish gets a fresh, never-cancelled token
            // rather than one tied to any caller's request-path cancellation.
            let token = tokio_util::sync::CancellationToken::new();
            match self.transport.publish(&row.message_type, row.payload.clone(), token).await {
                Ok(()) => {
                    if let Err(error) = self.store.mark_published(row.id).await {
                        warn!(%error, message_id = %row.id, "failed to mark outbox row published");
                    }
                    counter!("outbox.processed", "message_type" => row.message_type.clone()).increment(1);
                }
                Err(error) => {
                    any_failed = true;
                    let message = error.to_string();
                    if let Err(store_error) =
                        self.store.mark_failed(row.id, message.clone(), self.config.max_attempts).await
                    {
                        warn!(%store_error, message_id = %row.id, "failed to mark outbox row failed");
                    }
                    counter!("outbox.failed", "message_type" => row.message_type.clone()).increment(1);
                    warn!(message_id = %row.id, %message, "outbox publish failed");
                }
            }
        }

        histogram!("outbox.batch.duration").record(started.elapsed().as_secs_f64());

        if any_failed {
            tokio::time::sleep(self.config.error_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fc_common::{HealthState, MessageId};
    use fc_store::InMemoryOutboxStore;
    use fc_transport::{InMemoryTransport, TransportError};

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        fn name(&self) -> &str {
            "failing"
        }

        async fn publish(
            &self,
            _topic: &str,
            _payload: Vec<u8>,
            _token: tokio_util::sync::CancellationToken,
        ) -> Result<(), TransportError> {
            Err(TransportError::SendFailed { message: "simulated failure".to_string() })
        }

        async fn send(
            &self,
            _topic: &str,
            _destination: &str,
            _payload: Vec<u8>,
            _token: tokio_util::sync::CancellationToken,
        ) -> Result<(), TransportError> {
            Err(TransportError::SendFailed { message: "simulated failure".to_string() })
        }

        async fn subscribe(&self, _topic: &str, _handler: fc_transport::MessageHandler) -> Result<(), TransportError> {
            Ok(())
        }

        fn health_status(&self) -> HealthState {
            HealthState::Unhealthy
        }
    }

    #[tokio::test]
    async fn s8_pending_rows_are_published_and_marked_published() {
        let store = Arc::new(InMemoryOutboxStore::new());
        let transport = Arc::new(InMemoryTransport::new("test"));
        let received = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let received_handle = received.clone();
        transport
            .subscribe(
                "demo.event",
                Arc::new(move |_payload| {
                    let received = received_handle.clone();
                    Box::pin(async move {
                        received.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    })
                }),
            )
            .await
            .unwrap();

        for i in 1..=3 {
            store
                .add(
                    OutboxRow::new(MessageId(i), "demo.event", format!("payload-{i}").into_bytes()),
                    tokio_util::sync::CancellationToken::new(),
                )
                .await
                .unwrap();
        }

        let processor = OutboxProcessor::new(store.clone(), transport.clone(), OutboxProcessorConfig::default());
        processor.process_batch().await;
        transport.wait_for_completion().await.unwrap();

        assert!(store.get_pending(10).await.unwrap().is_empty());
        assert_eq!(received.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn publish_failure_keeps_row_pending_until_max_attempts_then_marks_failed() {
        let store = Arc::new(InMemoryOutboxStore::new());
        let transport = Arc::new(FailingTransport);
        store
            .add(OutboxRow::new(MessageId(1), "demo.event", b"x".to_vec()), tokio_util::sync::CancellationToken::new())
            .await
            .unwrap();

        let config = OutboxProcessorConfig {
            error_delay: Duration::from_millis(1),
            max_attempts: 2,
            ..OutboxProcessorConfig::default()
        };
        let processor = OutboxProcessor::new(store.clone(), transport, config);

        processor.process_batch().await;
        assert_eq!(
            store.get_pending(10).await.unwrap().len(),
            1,
            "row below max_attempts stays pending for the next scan"
        );

        processor.process_batch().await;
        assert!(
            store.get_pending(10).await.unwrap().is_empty(),
            "row reaches max_attempts and becomes terminally failed"
        );
    }
}
