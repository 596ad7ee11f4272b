//! Standard priority-400 behavior: reliable publish. This wraps *publish*,
//! not the request pipeline — an event published
//! this way is durably queued before the caller's `send`/`publish` returns,
//! rather than dispatched directly to transport. `Mediator::publish` fans
//! straight out to in-process handlers (C7); `OutboxPublisher` is the
//! alternative entry point for events that must survive a crash between
//! "decided to publish" and "actually sent".

use std::sync::Arc;

use fc_common::{Event, MediatorResult, SerializerRegistry};
use fc_store::{OutboxRow, OutboxStore};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Writes an `OutboxStore` row synchronously; the caller commits it in the
/// same persistence scope as whatever local state change produced the event
/// (outbox-write atomicity is enforced by the caller, not here).
pub struct OutboxPublisher {
    store: Arc<dyn OutboxStore>,
    serializer: SerializerRegistry,
}

impl OutboxPublisher {
    pub fn new(store: Arc<dyn OutboxStore>) -> Self {
        Self { store, serializer: SerializerRegistry::json() }
    }

    pub async fn publish<E>(&self, message_type: &str, event: &E, token: CancellationToken) -> MediatorResult<()>
    where
        E: Event + Serialize,
    {
        if token.is_cancelled() {
            return MediatorResult::failure(fc_common::MediatorError::Cancelled);
        }

        let payload = match self.serializer.serialize(event) {
            Ok(bytes) => bytes,
            Err(error) => return MediatorResult::failure(error),
        };

        let row = OutboxRow::new(event.message_id(), message_type, payload);
        match self.store.add(row, token).await {
            Ok(()) => MediatorResult::success(()),
            Err(error) => MediatorResult::failure(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_common::MessageId;
    use fc_store::InMemoryOutboxStore;
    use serde::Deserialize;

    #[derive(Clone, Serialize, Deserialize)]
    struct OrderPlaced {
        id: i64,
        total_cents: u64,
    }

    impl Event for OrderPlaced {
        fn message_id(&self) -> MessageId {
            MessageId(self.id)
        }
    }

    #[tokio::test]
    async fn publish_writes_a_pending_row_synchronously() {
        let store = Arc::new(InMemoryOutboxStore::new());
        let publisher = OutboxPublisher::new(store.clone());

        let result = publisher
            .publish("order.placed", &OrderPlaced { id: 1, total_cents: 500 }, CancellationToken::new())
            .await;
        assert!(result.is_ok());

        let pending = store.get_pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].message_type, "order.placed");
    }
}
