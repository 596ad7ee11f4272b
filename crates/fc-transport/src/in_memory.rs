//! In-process reference transport used by tests and `bin/fc-dev`. Fans
//! in-memory messages out to subscribed handlers on spawned tasks, so
//! publishers never block on handler execution — don't let the caller pay
//! for downstream work.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use fc_common::HealthState;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::TransportError;
use crate::transport::{MessageHandler, Transport};

pub struct InMemoryTransport {
    name: String,
    subscribers: DashMap<String, Vec<MessageHandler>>,
    accepting: AtomicBool,
    in_flight: Arc<AtomicU32>,
}

impl InMemoryTransport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subscribers: DashMap::new(),
            accepting: AtomicBool::new(true),
            in_flight: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn in_flight_count(&self) -> u32 {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn dispatch(&self, topic: &str, payload: Vec<u8>) {
        let Some(handlers) = self.subscribers.get(topic) else { return };
        for handler in handlers.iter().cloned() {
            let in_flight = self.in_flight.clone();
            let payload = payload.clone();
            in_flight.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                handler(payload).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            });
        }
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>, token: CancellationToken) -> Result<(), TransportError> {
        if token.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(TransportError::NotAccepting);
        }
        self.dispatch(topic, payload);
        Ok(())
    }

    async fn send(
        &self,
        topic: &str,
        destination: &str,
        payload: Vec<u8>,
        token: CancellationToken,
    ) -> Result<(), TransportError> {
        if token.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(TransportError::NotAccepting);
        }
        debug!(topic, destination, "sending point-to-point message");
        self.dispatch(topic, payload);
        Ok(())
    }

    async fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), TransportError> {
        self.subscribers.entry(topic.to_string()).or_default().push(handler);
        Ok(())
    }

    async fn stop_accepting_messages(&self) -> Result<(), TransportError> {
        self.accepting.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn wait_for_completion(&self) -> Result<(), TransportError> {
        while self.in_flight.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        true
    }

    fn health_status(&self) -> HealthState {
        HealthState::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32 as Counter;

    #[tokio::test]
    async fn s8_graceful_shutdown_drains_in_flight_then_rejects_new_publishes() {
        let transport = Arc::new(InMemoryTransport::new("test"));
        let completed = Arc::new(Counter::new(0));

        let completed_handle = completed.clone();
        transport
            .subscribe(
                "orders",
                Arc::new(move |_payload| {
                    let completed = completed_handle.clone();
                    Box::pin(async move {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        completed.fetch_add(1, Ordering::SeqCst);
                    })
                }),
            )
            .await
            .unwrap();

        for i in 0..5u8 {
            transport.publish("orders", vec![i], CancellationToken::new()).await.unwrap();
        }

        transport.stop_accepting_messages().await.unwrap();
        let sixth = transport.publish("orders", vec![6], CancellationToken::new()).await;
        assert!(matches!(sixth, Err(TransportError::NotAccepting)));

        transport.wait_for_completion().await.unwrap();
        assert_eq!(completed.load(Ordering::SeqCst), 5);
        assert_eq!(transport.in_flight_count(), 0);
    }
}
