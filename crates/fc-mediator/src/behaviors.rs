//! The standard reliability behaviors, one module per behavior.

pub mod circuit_breaker;
pub mod dead_letter;
pub mod inbox;
pub mod logging;
pub mod outbox;
pub mod retry;
pub mod validation;
