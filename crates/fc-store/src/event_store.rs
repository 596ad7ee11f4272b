//! Append-only per-stream event log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fc_common::MessageId;
use parking_lot::Mutex;

use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct StoredEvent {
    pub id: MessageId,
    pub event_type: String,
    pub payload: Vec<u8>,
    pub recorded_at: DateTime<Utc>,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, stream_id: &str, events: Vec<StoredEvent>) -> Result<(), StoreError>;

    /// Returns the stream's events in append order. The abstract "lazy
    /// sequence" is realized as an eagerly-collected `Vec`
    /// here since the in-memory reference store has no I/O to stage lazily.
    async fn read(&self, stream_id: &str) -> Result<Vec<StoredEvent>, StoreError>;
}

#[derive(Default)]
pub struct InMemoryEventStore {
    streams: DashMap<String, Mutex<Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, stream_id: &str, events: Vec<StoredEvent>) -> Result<(), StoreError> {
        self.streams
            .entry(stream_id.to_string())
            .or_insert_with(|| Mutex::new(Vec::new()))
            .lock()
            .extend(events);
        Ok(())
    }

    async fn read(&self, stream_id: &str) -> Result<Vec<StoredEvent>, StoreError> {
        Ok(self
            .streams
            .get(stream_id)
            .map(|stream| stream.lock().clone())
            .unwrap_or_default())
    }
}
