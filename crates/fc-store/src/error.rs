use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    #[error("store operation failed: {message}")]
    OperationFailed { message: String },
}

impl From<StoreError> for fc_common::MediatorError {
    fn from(err: StoreError) -> Self {
        fc_common::MediatorError::PersistenceFailed { message: err.to_string() }
    }
}
