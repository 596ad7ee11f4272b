//! Outbox processor (C9): periodic scan of pending outbox rows, published
//! through a `Transport`, with durable status updates on either outcome.

pub mod processor;

pub use processor::{OutboxProcessor, OutboxProcessorConfig};
