//! Store interfaces (C4): Inbox (idempotent receive), Outbox (pending-message
//! queue), EventStore (append-only), plus in-memory reference implementations
//! for tests and `bin/fc-dev`. Concrete durable backends are out of scope per
//! out of scope here — integrators implement these traits against their own storage.

pub mod error;
pub mod event_store;
pub mod inbox;
pub mod outbox;

pub use error::StoreError;
pub use event_store::{EventStore, InMemoryEventStore, StoredEvent};
pub use inbox::{InMemoryInboxStore, InboxEntry, InboxStore};
pub use outbox::{InMemoryOutboxStore, OutboxRow, OutboxRowStatus, OutboxStore};
