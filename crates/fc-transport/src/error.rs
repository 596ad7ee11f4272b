use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("transport is not accepting messages")]
    NotAccepting,

    #[error("transport send failed: {message}")]
    SendFailed { message: String },

    #[error("transport shutdown timed out after {0:?}")]
    ShutdownTimedOut(std::time::Duration),

    #[error("transport operation cancelled")]
    Cancelled,
}

impl From<TransportError> for fc_common::MediatorError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Cancelled => fc_common::MediatorError::Cancelled,
            other => fc_common::MediatorError::TransportFailed { message: other.to_string() },
        }
    }
}
