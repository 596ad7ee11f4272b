//! Mediator core: typed dispatch (C7), the behavior pipeline (C6), the
//! standard reliability behaviors (§4.3), and the auto-batcher (C8).

pub mod batcher;
pub mod behavior;
pub mod behaviors;
pub mod handler;
pub mod mediator;
pub mod pipeline;

pub use batcher::{AutoBatcher, BatchProfile};
pub use behavior::{priority, Behavior, BoxFuture, Next};
pub use handler::{EventHandler, Handler};
pub use mediator::{Mediator, MediatorBuilder};
pub use pipeline::{compose, Chain};

pub use behaviors::circuit_breaker::{CircuitBreakerBehavior, CircuitBreakerConfig};
pub use behaviors::dead_letter::{DeadLetterBehavior, DeadLetterEntry, DeadLetterSink, InMemoryDeadLetterSink};
pub use behaviors::inbox::InboxBehavior;
pub use behaviors::logging::LoggingBehavior;
pub use behaviors::outbox::OutboxPublisher;
pub use behaviors::retry::{RetryBehavior, RetryConfig};
pub use behaviors::validation::{Validatable, ValidationBehavior};
