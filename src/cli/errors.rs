//! CLI errors
//!
//! Every variant ends the process with exit code 1. `main` prints the
//! stable code in front of the message.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    /// The data directory has no commit log to read
    #[error(
        "No engine found in {}. Run 'classkv serve --data-dir {}' first.",
        .0.display(),
        .0.display()
    )]
    NotInitialized(PathBuf),

    /// Engine open, runtime creation or server failure
    #[error("{0}")]
    Boot(String),

    #[error("{0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(_) => "CLASSKV_CLI_CONFIG_ERROR",
            CliError::NotInitialized(_) => "CLASSKV_CLI_NOT_INITIALIZED",
            CliError::Boot(_) => "CLASSKV_CLI_BOOT_FAILED",
            CliError::Store(_) => "CLASSKV_CLI_STORE_ERROR",
            CliError::Io(_) | CliError::Json(_) => "CLASSKV_CLI_IO_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_initialized_names_the_directory() {
        let err = CliError::NotInitialized(PathBuf::from("/srv/classkv"));
        assert_eq!(err.code(), "CLASSKV_CLI_NOT_INITIALIZED");
        assert!(err.to_string().contains("--data-dir /srv/classkv"));
    }

    #[test]
    fn test_io_errors_convert() {
        let err = CliError::from(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"));
        assert_eq!(err.code(), "CLASSKV_CLI_IO_ERROR");
    }
}
