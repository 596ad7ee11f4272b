use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdGenError {
    #[error("invalid snowflake layout: timestampBits+workerIdBits+sequenceBits must equal 63, got {sum}")]
    InvalidLayout { sum: u16 },

    #[error("worker id {worker_id} out of range for a {worker_id_bits}-bit layout (max {max})")]
    InvalidWorkerId { worker_id: u64, worker_id_bits: u8, max: u64 },

    #[error("id generator timed out: {message}")]
    Timeout { message: String },
}

impl IdGenError {
    pub fn clock_regression(delta_millis: i64) -> Self {
        Self::Timeout {
            message: format!("clock_regression: clock moved backwards by {delta_millis}ms"),
        }
    }

    pub fn sequence_exhausted(spin_budget_millis: u64) -> Self {
        Self::Timeout {
            message: format!(
                "sequence_exhausted: next millisecond did not arrive within {spin_budget_millis}ms spin budget"
            ),
        }
    }
}

impl From<IdGenError> for fc_common::MediatorError {
    fn from(err: IdGenError) -> Self {
        match err {
            IdGenError::Timeout { message } => fc_common::MediatorError::Timeout { message },
            other => fc_common::MediatorError::InternalError { message: other.to_string() },
        }
    }
}
