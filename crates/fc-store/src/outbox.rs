//! Durable queue of outbound messages awaiting publish (C4 Outbox half).

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fc_common::MessageId;
use parking_lot::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxRowStatus {
    Pending,
    Published,
    Failed,
}

#[derive(Debug, Clone)]
pub struct OutboxRow {
    pub id: MessageId,
    pub message_type: String,
    pub payload: Vec<u8>,
    pub status: OutboxRowStatus,
    pub created_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub attempt_count: u32,
}

impl OutboxRow {
    pub fn new(id: MessageId, message_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id,
            message_type: message_type.into(),
            payload,
            status: OutboxRowStatus::Pending,
            created_at: Utc::now(),
            last_error: None,
            attempt_count: 0,
        }
    }
}

#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Inserted synchronously in the caller's persistence scope (the
    /// "Outbox insert and local state change must be atomic" — that atomicity
    /// is the caller's responsibility, this method is just the write).
    async fn add(&self, row: OutboxRow, token: CancellationToken) -> Result<(), StoreError>;

    async fn get_pending(&self, max_count: usize) -> Result<Vec<OutboxRow>, StoreError>;

    async fn mark_published(&self, id: MessageId) -> Result<(), StoreError>;

    /// Records a publish failure. The row stays `Pending` (so the next scan
    /// retries it) until `attempt_count` reaches `max_attempts`, at which
    /// point it becomes terminal `Failed`.
    async fn mark_failed(&self, id: MessageId, error: String, max_attempts: u32) -> Result<(), StoreError>;

    async fn delete_published(&self, retention: chrono::Duration) -> Result<u64, StoreError>;
}

/// Reference in-memory outbox. FIFO by insertion order within `get_pending`,
/// matching the principle that the outbox processor preserves `getPending` store
/// order for one batch" guarantee.
#[derive(Default)]
pub struct InMemoryOutboxStore {
    rows: DashMap<i64, OutboxRow>,
    insertion_order: Mutex<Vec<i64>>,
}

impl InMemoryOutboxStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutboxStore {
    async fn add(&self, row: OutboxRow, _token: CancellationToken) -> Result<(), StoreError> {
        let key = row.id.value();
        self.insertion_order.lock().push(key);
        self.rows.insert(key, row);
        Ok(())
    }

    async fn get_pending(&self, max_count: usize) -> Result<Vec<OutboxRow>, StoreError> {
        let order = self.insertion_order.lock().clone();
        let mut out = Vec::with_capacity(max_count.min(order.len()));
        for key in order {
            if out.len() >= max_count {
                break;
            }
            if let Some(row) = self.rows.get(&key) {
                if row.status == OutboxRowStatus::Pending {
                    out.push(row.clone());
                }
            }
        }
        Ok(out)
    }

    async fn mark_published(&self, id: MessageId) -> Result<(), StoreError> {
        if let Some(mut row) = self.rows.get_mut(&id.value()) {
            row.status = OutboxRowStatus::Published;
        }
        Ok(())
    }

    async fn mark_failed(&self, id: MessageId, error: String, max_attempts: u32) -> Result<(), StoreError> {
        if let Some(mut row) = self.rows.get_mut(&id.value()) {
            row.attempt_count += 1;
            row.last_error = Some(error);
            if row.attempt_count >= max_attempts {
                row.status = OutboxRowStatus::Failed;
            }
        }
        Ok(())
    }

    async fn delete_published(&self, retention: chrono::Duration) -> Result<u64, StoreError> {
        let cutoff = Utc::now() - retention;
        let to_remove: Vec<i64> = self
            .rows
            .iter()
            .filter(|entry| entry.status == OutboxRowStatus::Published && entry.created_at < cutoff)
            .map(|entry| *entry.key())
            .collect();
        for key in &to_remove {
            self.rows.remove(key);
        }
        self.insertion_order.lock().retain(|key| !to_remove.contains(key));
        Ok(to_remove.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn s7_pending_rows_are_returned_in_insertion_order() {
        let store = InMemoryOutboxStore::new();
        for i in 1..=3 {
            store.add(OutboxRow::new(MessageId(i), "order.created", vec![i as u8]), CancellationToken::new()).await.unwrap();
        }

        let pending = store.get_pending(10).await.unwrap();
        assert_eq!(pending.iter().map(|r| r.id.value()).collect::<Vec<_>>(), vec![1, 2, 3]);

        store.mark_published(MessageId(1)).await.unwrap();
        let remaining = store.get_pending(10).await.unwrap();
        assert_eq!(remaining.iter().map(|r| r.id.value()).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[tokio::test]
    async fn mark_failed_stays_pending_until_max_attempts_then_goes_terminal() {
        let store = InMemoryOutboxStore::new();
        store.add(OutboxRow::new(MessageId(9), "t", vec![]), CancellationToken::new()).await.unwrap();

        store.mark_failed(MessageId(9), "boom".to_string(), 3).await.unwrap();
        {
            let row = store.rows.get(&9).unwrap();
            assert_eq!(row.attempt_count, 1);
            assert_eq!(row.status, OutboxRowStatus::Pending, "below max_attempts, row stays eligible for retry");
            assert_eq!(row.last_error.as_deref(), Some("boom"));
        }
        assert_eq!(store.get_pending(10).await.unwrap().len(), 1, "a failed-but-pending row is still scanned");

        store.mark_failed(MessageId(9), "boom again".to_string(), 3).await.unwrap();
        {
            let row = store.rows.get(&9).unwrap();
            assert_eq!(row.attempt_count, 2);
            assert_eq!(row.status, OutboxRowStatus::Pending);
        }

        store.mark_failed(MessageId(9), "boom thrice".to_string(), 3).await.unwrap();
        let row = store.rows.get(&9).unwrap();
        assert_eq!(row.attempt_count, 3);
        assert_eq!(row.status, OutboxRowStatus::Failed, "attempt_count reached max_attempts, now terminal");
        assert!(store.get_pending(10).await.unwrap().is_empty());
    }
}
