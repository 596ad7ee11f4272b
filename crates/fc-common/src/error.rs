//! Closed error taxonomy for the mediator core.

use thiserror::Error;

/// The ten closed error codes a `MediatorResult` can carry.
///
/// Retryable subset: `LockFailed`, `PersistenceFailed`, `TransportFailed`, `Timeout`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediatorError {
    #[error("validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("handler failed: {message}")]
    HandlerFailed { message: String },

    #[error("pipeline failed: {message}")]
    PipelineFailed { message: String },

    #[error("persistence failed: {message}")]
    PersistenceFailed { message: String },

    #[error("lock failed: {message}")]
    LockFailed { message: String },

    #[error("transport failed: {message}")]
    TransportFailed { message: String },

    #[error("serialization failed: {message}")]
    SerializationFailed { message: String },

    #[error("timed out: {message}")]
    Timeout { message: String },

    #[error("cancelled")]
    Cancelled,

    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl MediatorError {
    /// Stable programmatic error code for the closed taxonomy.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationFailed { .. } => "ValidationFailed",
            Self::HandlerFailed { .. } => "HandlerFailed",
            Self::PipelineFailed { .. } => "PipelineFailed",
            Self::PersistenceFailed { .. } => "PersistenceFailed",
            Self::LockFailed { .. } => "LockFailed",
            Self::TransportFailed { .. } => "TransportFailed",
            Self::SerializationFailed { .. } => "SerializationFailed",
            Self::Timeout { .. } => "Timeout",
            Self::Cancelled => "Cancelled",
            Self::InternalError { .. } => "InternalError",
        }
    }

    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::LockFailed { .. }
                | Self::PersistenceFailed { .. }
                | Self::TransportFailed { .. }
                | Self::Timeout { .. }
        )
    }

    pub fn handler_failed(message: impl Into<String>) -> Self {
        Self::HandlerFailed { message: message.into() }
    }

    /// Constructs the specific sub-reason required for dispatch to an
    /// unregistered request or event type.
    pub fn handler_not_registered(type_name: &str) -> Self {
        Self::HandlerFailed {
            message: format!("handler_not_registered: no handler registered for {type_name}"),
        }
    }

    pub fn pipeline_failed(message: impl Into<String>) -> Self {
        Self::PipelineFailed { message: message.into() }
    }

    pub fn clock_regression(delta_ms: i64) -> Self {
        Self::Timeout {
            message: format!("clock_regression: time moved backwards by {delta_ms}ms"),
        }
    }
}

impl From<serde_json::Error> for MediatorError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationFailed { message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_subset_matches_spec() {
        assert!(MediatorError::LockFailed { message: String::new() }.retryable());
        assert!(MediatorError::PersistenceFailed { message: String::new() }.retryable());
        assert!(MediatorError::TransportFailed { message: String::new() }.retryable());
        assert!(MediatorError::Timeout { message: String::new() }.retryable());

        assert!(!MediatorError::ValidationFailed { message: String::new() }.retryable());
        assert!(!MediatorError::HandlerFailed { message: String::new() }.retryable());
        assert!(!MediatorError::PipelineFailed { message: String::new() }.retryable());
        assert!(!MediatorError::SerializationFailed { message: String::new() }.retryable());
        assert!(!MediatorError::Cancelled.retryable());
        assert!(!MediatorError::InternalError { message: String::new() }.retryable());
    }

    #[test]
    fn codes_are_stable_programmatic_strings() {
        assert_eq!(MediatorError::Cancelled.code(), "Cancelled");
        assert_eq!(MediatorError::handler_not_registered("CreateOrder").code(), "HandlerFailed");
    }

    #[test]
    fn handler_not_registered_names_the_sub_reason() {
        let err = MediatorError::handler_not_registered("CreateOrder");
        assert!(err.to_string().contains("handler_not_registered"));
        assert!(err.to_string().contains("CreateOrder"));
    }
}
