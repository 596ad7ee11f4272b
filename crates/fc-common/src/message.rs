//! Message identity shared by every request and event flowing through the mediator.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A 64-bit identifier produced by the id generator.
///
/// Comparable as an integer for ordering within the worker that produced it;
/// see `fc-idgen` for the generation algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i64);

impl MessageId {
    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MessageId {
    fn from(value: i64) -> Self {
        MessageId(value)
    }
}

impl From<MessageId> for i64 {
    fn from(id: MessageId) -> Self {
        id.0
    }
}

/// A typed value dispatched through `Mediator::send`, declaring its response type.
pub trait Request: Send + Sync + 'static {
    type Response: Send + Sync + 'static;

    fn message_id(&self) -> MessageId;
}

/// A typed value dispatched through `Mediator::publish`, with no response.
pub trait Event: Send + Sync + Clone + 'static {
    fn message_id(&self) -> MessageId;
}
