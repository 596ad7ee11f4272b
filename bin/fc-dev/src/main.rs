//! Development binary: wires the mediator core against in-memory transports
//! and stores so the whole pipeline can be exercised without any external
//! infrastructure.
//!
//! ## Demonstrates
//!
//! - A `CreateOrder` request routed through validation, dead-lettering,
//!   retry, the circuit breaker, and inbox idempotency.
//! - A `GetOrderTotal` request auto-batched by tenant.
//! - An `OrderPlaced` event fanned out in-process and durably queued
//!   through the outbox.
//! - The outbox processor, recovery supervisor, and transport lifecycle host
//!   running as background workers under one coordinated shutdown.

mod domain;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fc_config::AppConfig;
use fc_host::{ApplicationHost, ApplicationHostConfig, TransportLifecycleHost, TransportLifecycleHostConfig};
use fc_idgen::{auto_detect_worker_id, IdGenerator, SnowflakeLayout};
use fc_mediator::{
    BatchProfile, CircuitBreakerBehavior, CircuitBreakerConfig, DeadLetterBehavior, InMemoryDeadLetterSink,
    InboxBehavior, LoggingBehavior, MediatorBuilder, OutboxPublisher, RetryBehavior, RetryConfig, ValidationBehavior,
};
use fc_outbox::{OutboxProcessor, OutboxProcessorConfig};
use fc_recovery::{RecoverySupervisor, RecoverySupervisorConfig};
use fc_store::{InMemoryInboxStore, InMemoryOutboxStore};
use fc_transport::InMemoryTransport;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::domain::{CreateOrder, CreateOrderHandler, GetOrderTotal, GetOrderTotalHandler, OrderPlaced, OrderPlacedLogger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    fc_common::logging::init_logging("fc-dev");
    info!("starting fc-dev");

    let config = AppConfig::load()?;
    info!(dev_mode = config.dev_mode, "loaded configuration");

    let _prometheus = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // 1. Id generator, worker id resolved per the configured auto-detection order.
    let layout = SnowflakeLayout::new(
        config.idgen.custom_epoch_millis,
        config.idgen.layout.timestamp_bits,
        config.idgen.layout.worker_id_bits,
        config.idgen.layout.sequence_bits,
    )?;
    let worker_id = if config.idgen.auto_detect_worker_id {
        auto_detect_worker_id(config.idgen.layout.worker_id_bits, config.idgen.worker_id)
    } else {
        config.idgen.worker_id
    };
    let id_gen = Arc::new(IdGenerator::new(layout, worker_id)?);
    info!(worker_id, "id generator ready");

    // 2. In-memory stores and transport.
    let inbox_store: Arc<dyn fc_store::InboxStore> = Arc::new(InMemoryInboxStore::new());
    let outbox_store = Arc::new(InMemoryOutboxStore::new());
    let transport: Arc<dyn fc_transport::Transport> = Arc::new(InMemoryTransport::new("fc-dev"));

    let order_events_received = Arc::new(AtomicU64::new(0));
    {
        let received = order_events_received.clone();
        transport
            .subscribe(
                "order.placed",
                Arc::new(move |_payload| {
                    let received = received.clone();
                    Box::pin(async move {
                        received.fetch_add(1, Ordering::SeqCst);
                    })
                }),
            )
            .await?;
    }

    // 3. Mediator: the standard behavior chain for CreateOrder, plus an
    //    auto-batched handler for GetOrderTotal.
    let dead_letter_sink = Arc::new(InMemoryDeadLetterSink::<CreateOrder>::new());
    let mediator = MediatorBuilder::new()
        .with_auto_batching(config.mediator.enable_auto_batching)
        .register_handler(
            Arc::new(CreateOrderHandler::new(id_gen.clone())),
            vec![
                Arc::new(LoggingBehavior::new()),
                Arc::new(ValidationBehavior::new()),
                Arc::new(DeadLetterBehavior::new(dead_letter_sink.clone())),
                Arc::new(RetryBehavior::new(RetryConfig::default())),
                Arc::new(CircuitBreakerBehavior::new(CircuitBreakerConfig::default())),
                Arc::new(InboxBehavior::<CreateOrder>::new(
                    inbox_store.clone(),
                    Duration::from_secs(config.inbox.retention_secs),
                )),
            ],
        )
        .register_batched_handler(
            Arc::new(GetOrderTotalHandler),
            vec![Arc::new(LoggingBehavior::new())],
            |req: &GetOrderTotal| req.tenant_id.clone(),
            BatchProfile {
                max_batch_size: config.batcher.max_batch_size,
                batch_timeout: Duration::from_millis(config.batcher.batch_timeout_ms),
                max_queue_length: config.batcher.max_queue_length,
                shard_idle_ttl: Duration::from_secs(config.batcher.shard_idle_ttl_secs),
                max_shards: config.batcher.max_shards,
                flush_degree: config.batcher.flush_degree,
            },
        )
        .register_event_handler(Arc::new(OrderPlacedLogger))
        .build();

    // 4. Hosted background workers, all driven by one shared shutdown broadcast.
    let outbox_processor = Arc::new(OutboxProcessor::new(
        outbox_store.clone(),
        transport.clone(),
        OutboxProcessorConfig {
            scan_interval: Duration::from_millis(config.outbox.scan_interval_ms),
            batch_size: config.outbox.batch_size,
            error_delay: Duration::from_millis(config.outbox.error_delay_ms),
            complete_current_batch_on_shutdown: config.outbox.complete_current_batch_on_shutdown,
            max_attempts: config.outbox.max_attempts,
        },
    ));

    let recovery_supervisor = Arc::new(RecoverySupervisor::new(
        vec![],
        RecoverySupervisorConfig {
            check_interval: Duration::from_millis(config.recovery.check_interval_ms),
            max_retries: config.recovery.max_retries,
            retry_delay: Duration::from_millis(config.recovery.retry_delay_ms),
            use_exponential_backoff: config.recovery.use_exponential_backoff,
            enable_auto_recovery: config.recovery.enable_auto_recovery,
        },
    ));

    let transport_host = Arc::new(TransportLifecycleHost::new(
        vec![transport.clone()],
        TransportLifecycleHostConfig {
            shutdown_timeout: Duration::from_secs(config.lifecycle.shutdown_timeout_secs),
            enable_transport_hosting: config.lifecycle.enable_transport_hosting,
        },
    ));

    let host = ApplicationHost::new(
        transport_host,
        vec![outbox_processor],
        Some(recovery_supervisor),
        ApplicationHostConfig {
            enable_outbox_processor: config.lifecycle.enable_outbox_processor,
            enable_auto_recovery: config.lifecycle.enable_auto_recovery,
        },
    );

    // 5. Drive a handful of demo requests before waiting on the hosted
    //    workers, so a fresh checkout has something to observe in the logs.
    let create_result = mediator
        .send(
            CreateOrder { message_id: fc_common::MessageId(id_gen.next_id()?), order_id: "demo-order-1".into() },
            CancellationToken::new(),
        )
        .await;
    info!(?create_result, "demo CreateOrder dispatched");

    let placed = OrderPlaced { message_id: fc_common::MessageId(id_gen.next_id()?), order_id: "demo-order-1".into() };
    mediator.publish(placed.clone(), CancellationToken::new()).await;
    OutboxPublisher::new(outbox_store.clone())
        .publish("order.placed", &placed, CancellationToken::new())
        .await;

    host.run_until_shutdown().await?;

    info!(
        order_events_received = order_events_received.load(Ordering::SeqCst),
        "fc-dev shut down"
    );
    Ok(())
}
