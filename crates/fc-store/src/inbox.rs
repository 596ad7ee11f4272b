//! Idempotent-receive log: "have I processed this messageId before?"
//!
//! Per the Open Question decision recorded in DESIGN.md, a hit replays the
//! stored handler response rather than a typed marker, so the entry carries
//! the serialized response alongside the bookkeeping fields.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fc_common::MessageId;
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct InboxEntry {
    pub message_id: MessageId,
    pub first_seen_at: DateTime<Utc>,
    /// Serialized response recorded after the handler's first successful run.
    pub cached_response: Option<Vec<u8>>,
}

#[async_trait]
pub trait InboxStore: Send + Sync {
    async fn contains(&self, id: MessageId, token: CancellationToken) -> Result<bool, StoreError>;

    /// Records `id` as processed, with the serialized response to replay on
    /// future hits, retained for `ttl`.
    async fn record(
        &self,
        id: MessageId,
        response: Vec<u8>,
        ttl: Duration,
        token: CancellationToken,
    ) -> Result<(), StoreError>;

    async fn get_cached_response(
        &self,
        id: MessageId,
        token: CancellationToken,
    ) -> Result<Option<Vec<u8>>, StoreError>;

    /// Best-effort removal of entries past their retention window.
    async fn expire(&self) -> Result<u64, StoreError>;
}

struct StoredEntry {
    entry: InboxEntry,
    expires_at: DateTime<Utc>,
}

/// Reference in-memory inbox, using `DashMap` as the default concurrent map
/// for any store-shaped structure touched from many tasks.
#[derive(Default)]
pub struct InMemoryInboxStore {
    entries: DashMap<i64, StoredEntry>,
}

impl InMemoryInboxStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InboxStore for InMemoryInboxStore {
    async fn contains(&self, id: MessageId, _token: CancellationToken) -> Result<bool, StoreError> {
        match self.entries.get(&id.value()) {
            Some(stored) => Ok(stored.expires_at > Utc::now()),
            None => Ok(false),
        }
    }

    async fn record(
        &self,
        id: MessageId,
        response: Vec<u8>,
        ttl: Duration,
        _token: CancellationToken,
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        let expires_at = now
            + chrono::Duration::from_std(ttl).map_err(|e| StoreError::OperationFailed { message: e.to_string() })?;
        self.entries.insert(
            id.value(),
            StoredEntry {
                entry: InboxEntry { message_id: id, first_seen_at: now, cached_response: Some(response) },
                expires_at,
            },
        );
        Ok(())
    }

    async fn get_cached_response(
        &self,
        id: MessageId,
        _token: CancellationToken,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .entries
            .get(&id.value())
            .filter(|stored| stored.expires_at > Utc::now())
            .and_then(|stored| stored.entry.cached_response.clone()))
    }

    async fn expire(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, stored| stored.expires_at > now);
        Ok((before - self.entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invariant_6_second_record_is_idempotent_and_replays_response() {
        let store = InMemoryInboxStore::new();
        let id = MessageId(42);

        assert!(!store.contains(id, CancellationToken::new()).await.unwrap());
        store.record(id, b"cached".to_vec(), Duration::from_secs(3600), CancellationToken::new()).await.unwrap();
        assert!(store.contains(id, CancellationToken::new()).await.unwrap());
        assert_eq!(
            store.get_cached_response(id, CancellationToken::new()).await.unwrap(),
            Some(b"cached".to_vec())
        );
    }

    #[tokio::test]
    async fn expired_entries_are_not_reported_present() {
        let store = InMemoryInboxStore::new();
        let id = MessageId(7);
        store.record(id, b"x".to_vec(), Duration::from_millis(0), CancellationToken::new()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!store.contains(id, CancellationToken::new()).await.unwrap());
    }
}
