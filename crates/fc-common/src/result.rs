//! The mediator's result type, realized as a proper Rust enum rather than
//! a boolean-flag struct.

use std::collections::HashMap;

use crate::error::MediatorError;

/// Outcome of a mediator `send` or a single behavior invocation.
///
/// The `ok`/`retryable`/`errorCode`/`metadata` shape of an abstract result type
/// are exposed as methods over this enum rather than public struct fields.
#[derive(Debug, Clone)]
pub enum MediatorResult<R> {
    Ok {
        value: R,
        metadata: HashMap<String, String>,
    },
    Err {
        error: MediatorError,
        retryable: bool,
        metadata: HashMap<String, String>,
    },
}

impl<R> MediatorResult<R> {
    pub fn success(value: R) -> Self {
        Self::Ok { value, metadata: HashMap::new() }
    }

    pub fn success_with_metadata(value: R, metadata: HashMap<String, String>) -> Self {
        Self::Ok { value, metadata }
    }

    pub fn failure(error: MediatorError) -> Self {
        let retryable = error.retryable();
        Self::Err { error, retryable, metadata: HashMap::new() }
    }

    pub fn failure_with_metadata(error: MediatorError, metadata: HashMap<String, String>) -> Self {
        let retryable = error.retryable();
        Self::Err { error, retryable, metadata }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }

    pub fn retryable(&self) -> bool {
        match self {
            Self::Err { retryable, .. } => *retryable,
            Self::Ok { .. } => false,
        }
    }

    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Err { error, .. } => Some(error.code()),
            Self::Ok { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&MediatorError> {
        match self {
            Self::Err { error, .. } => Some(error),
            Self::Ok { .. } => None,
        }
    }

    pub fn value(&self) -> Option<&R> {
        match self {
            Self::Ok { value, .. } => Some(value),
            Self::Err { .. } => None,
        }
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        match self {
            Self::Ok { metadata, .. } | Self::Err { metadata, .. } => metadata,
        }
    }

    pub fn with_metadata_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match &mut self {
            Self::Ok { metadata, .. } | Self::Err { metadata, .. } => {
                metadata.insert(key.into(), value.into());
            }
        }
        self
    }

    /// Maps the success value, leaving an error result untouched.
    pub fn map<U>(self, f: impl FnOnce(R) -> U) -> MediatorResult<U> {
        match self {
            Self::Ok { value, metadata } => MediatorResult::Ok { value: f(value), metadata },
            Self::Err { error, retryable, metadata } => MediatorResult::Err { error, retryable, metadata },
        }
    }

    pub fn into_std(self) -> Result<R, MediatorError> {
        match self {
            Self::Ok { value, .. } => Ok(value),
            Self::Err { error, .. } => Err(error),
        }
    }
}

impl<R> From<Result<R, MediatorError>> for MediatorResult<R> {
    fn from(result: Result<R, MediatorError>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(error) => Self::failure(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_derives_retryable_from_the_error_code() {
        let retryable = MediatorResult::<()>::failure(MediatorError::Timeout { message: "x".into() });
        assert!(retryable.retryable());

        let not_retryable = MediatorResult::<()>::failure(MediatorError::ValidationFailed { message: "x".into() });
        assert!(!not_retryable.retryable());
    }

    #[test]
    fn map_transforms_success_and_skips_failure() {
        let ok: MediatorResult<i32> = MediatorResult::success(2);
        assert_eq!(ok.map(|v| v * 10).value(), Some(&20));

        let err: MediatorResult<i32> = MediatorResult::failure(MediatorError::InternalError { message: "x".into() });
        let mapped = err.map(|v| v * 10);
        assert!(mapped.is_err());
    }

    #[test]
    fn with_metadata_entry_accumulates_on_either_variant() {
        let ok = MediatorResult::success(1).with_metadata_entry("handler", "Foo").with_metadata_entry("attempt", "3");
        assert_eq!(ok.metadata().get("handler").map(String::as_str), Some("Foo"));
        assert_eq!(ok.metadata().get("attempt").map(String::as_str), Some("3"));
    }
}
