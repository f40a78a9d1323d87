//! Record store errors

use thiserror::Error;

use crate::engine::EngineError;

/// Result type for record store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised inside record store transactions.
///
/// None of these reach RPC callers under the default error policy; they
/// are logged at the store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Engine failure, including key-not-found during Get
    #[error("{0}")]
    Engine(#[from] EngineError),

    /// Stored key has no separator and cannot be split into id and field
    #[error("Malformed storage key: {0}")]
    MalformedKey(String),

    /// Stored value (or key) is not valid UTF-8
    #[error("Invalid UTF-8 in stored {what} for key {key}")]
    InvalidValue { what: &'static str, key: String },
}

impl StoreError {
    /// Returns true if this error means the requested record field is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Engine(e) if e.is_not_found())
    }

    /// Stable code for logs and RPC error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Engine(e) => e.code().code(),
            StoreError::MalformedKey(_) => "CLASSKV_MALFORMED_KEY",
            StoreError::InvalidValue { .. } => "CLASSKV_INVALID_VALUE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let err = StoreError::from(EngineError::key_not_found(b"cs101.Name"));
        assert!(err.is_not_found());
        assert_eq!(err.code(), "CLASSKV_KEY_NOT_FOUND");

        assert!(!StoreError::MalformedKey("k".into()).is_not_found());
    }

    #[test]
    fn test_display() {
        let err = StoreError::InvalidValue {
            what: "value",
            key: "cs101.Name".into(),
        };
        assert_eq!(err.to_string(), "Invalid UTF-8 in stored value for key cs101.Name");
    }
}
