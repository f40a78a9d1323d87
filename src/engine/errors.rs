//! Engine error types
//!
//! Error codes:
//! - CLASSKV_ENGINE_IO_ERROR (ERROR severity)
//! - CLASSKV_ENGINE_WRITE_FAILED (ERROR severity)
//! - CLASSKV_ENGINE_READ_FAILED (ERROR severity)
//! - CLASSKV_KEY_NOT_FOUND (ERROR severity)
//! - CLASSKV_ENGINE_CLOSED (ERROR severity)
//! - CLASSKV_DATA_CORRUPTION (FATAL severity)
//! - CLASSKV_ENGINE_UNRECOVERABLE (FATAL severity)

use std::fmt;
use std::io;

/// Severity levels for engine errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, server continues
    Error,
    /// The engine cannot be trusted any more
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Engine-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorCode {
    /// Disk I/O failure outside a read or write path (directory creation, metadata)
    IoError,
    /// Commit log append or fsync failed
    WriteFailed,
    /// Commit log read failed
    ReadFailed,
    /// Requested key does not exist
    KeyNotFound,
    /// Transaction attempted on a closed engine
    Closed,
    /// Commit log checksum or framing failure
    DataCorruption,
    /// The commit log is in an unknown state after a failed write; the
    /// engine stops accepting commits
    Unrecoverable,
}

impl EngineErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            EngineErrorCode::IoError => "CLASSKV_ENGINE_IO_ERROR",
            EngineErrorCode::WriteFailed => "CLASSKV_ENGINE_WRITE_FAILED",
            EngineErrorCode::ReadFailed => "CLASSKV_ENGINE_READ_FAILED",
            EngineErrorCode::KeyNotFound => "CLASSKV_KEY_NOT_FOUND",
            EngineErrorCode::Closed => "CLASSKV_ENGINE_CLOSED",
            EngineErrorCode::DataCorruption => "CLASSKV_DATA_CORRUPTION",
            EngineErrorCode::Unrecoverable => "CLASSKV_ENGINE_UNRECOVERABLE",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            EngineErrorCode::DataCorruption | EngineErrorCode::Unrecoverable => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for EngineErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Engine error with code, message and optional context
#[derive(Debug)]
pub struct EngineError {
    code: EngineErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl EngineError {
    fn new(code: EngineErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Create a new engine I/O error
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(EngineErrorCode::IoError, message)
        }
    }

    /// Create a new write failed error
    pub fn write_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(EngineErrorCode::WriteFailed, message)
        }
    }

    /// Create a new read failed error
    pub fn read_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(EngineErrorCode::ReadFailed, message)
        }
    }

    /// Create an error for a commit log that could not be restored after a
    /// failed write (FATAL)
    pub fn unrecoverable(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(EngineErrorCode::Unrecoverable, message)
        }
    }

    /// Create a key-not-found error for the given key
    pub fn key_not_found(key: &[u8]) -> Self {
        Self {
            details: Some(format!("key: {}", String::from_utf8_lossy(key))),
            ..Self::new(EngineErrorCode::KeyNotFound, "Key not found")
        }
    }

    /// Create an error for a transaction on a closed engine
    pub fn closed() -> Self {
        Self::new(EngineErrorCode::Closed, "Engine is closed")
    }

    /// Create an error for a poisoned internal lock
    pub fn lock_poisoned(what: &str) -> Self {
        Self::new(
            EngineErrorCode::IoError,
            format!("Engine {} lock poisoned", what),
        )
    }

    /// Create a data corruption error with byte offset context (FATAL)
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            details: Some(format!("byte_offset: {}", offset)),
            ..Self::new(EngineErrorCode::DataCorruption, reason)
        }
    }

    /// Returns the error code
    pub fn code(&self) -> EngineErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if this is a missing-key error
    pub fn is_not_found(&self) -> bool {
        self.code == EngineErrorCode::KeyNotFound
    }

    /// Returns whether this error is fatal
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(EngineErrorCode::KeyNotFound.code(), "CLASSKV_KEY_NOT_FOUND");
        assert_eq!(EngineErrorCode::DataCorruption.code(), "CLASSKV_DATA_CORRUPTION");
        assert_eq!(EngineErrorCode::WriteFailed.code(), "CLASSKV_ENGINE_WRITE_FAILED");
    }

    #[test]
    fn test_fatal_codes() {
        assert!(EngineError::corruption_at_offset(0, "bad").is_fatal());
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        assert!(EngineError::unrecoverable("rollback failed", io).is_fatal());
        assert!(!EngineError::key_not_found(b"a.Name").is_fatal());
        assert!(!EngineError::closed().is_fatal());
    }

    #[test]
    fn test_key_not_found_display() {
        let err = EngineError::key_not_found(b"cs101.Name");
        assert!(err.is_not_found());
        let display = err.to_string();
        assert!(display.contains("CLASSKV_KEY_NOT_FOUND"));
        assert!(display.contains("cs101.Name"));
    }

    #[test]
    fn test_corruption_display_has_offset() {
        let err = EngineError::corruption_at_offset(512, "checksum mismatch");
        let display = err.to_string();
        assert!(display.contains("FATAL"));
        assert!(display.contains("byte_offset: 512"));
    }
}
