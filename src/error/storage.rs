// Storage error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;
use std::path::Path;

/// Storage error code constants
///
/// Error code range: 1001-1006
pub struct StorageErrorCodes {}

impl StorageErrorCodes {
    /// Log directory does not exist
    pub const DIRECTORY_MISSING: i32 = 1001;

    /// A file for this session already exists
    pub const SESSION_EXISTS: i32 = 1002;

    /// Read or write failed
    pub const IO: i32 = 1003;

    /// Row elapsed time does not increase
    pub const OUT_OF_ORDER: i32 = 1004;

    /// Session file not found
    pub const SESSION_NOT_FOUND: i32 = 1005;

    /// File name is not a session id
    pub const INVALID_PATH: i32 = 1006;
}

/// Log a storage error with structured context
pub fn log_storage_error(err: &StorageError, context: &str) {
    error!(
        "Storage error in {}: code={}, component=SessionRecorder, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Session file errors
///
/// Raised by the recorder while opening, appending to, or reading a session
/// file. Failures to start a session are fatal to that session only.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    /// Log directory is missing; the host creates it before tracking starts
    DirectoryMissing { path: String },

    /// Session file already exists (session ids are start timestamps)
    SessionExists { path: String },

    /// Underlying I/O failure
    Io { path: String, details: String },

    /// Appended row is not strictly after the previous one
    OutOfOrder { previous: u32, attempted: u32 },

    /// No file recorded for the requested session
    SessionNotFound { path: String },

    /// Path does not name a session file
    InvalidPath { path: String },
}

impl StorageError {
    pub(crate) fn io(path: &Path, err: std::io::Error) -> Self {
        StorageError::Io {
            path: path.display().to_string(),
            details: err.to_string(),
        }
    }
}

impl ErrorCode for StorageError {
    fn code(&self) -> i32 {
        match self {
            StorageError::DirectoryMissing { .. } => StorageErrorCodes::DIRECTORY_MISSING,
            StorageError::SessionExists { .. } => StorageErrorCodes::SESSION_EXISTS,
            StorageError::Io { .. } => StorageErrorCodes::IO,
            StorageError::OutOfOrder { .. } => StorageErrorCodes::OUT_OF_ORDER,
            StorageError::SessionNotFound { .. } => StorageErrorCodes::SESSION_NOT_FOUND,
            StorageError::InvalidPath { .. } => StorageErrorCodes::INVALID_PATH,
        }
    }

    fn message(&self) -> String {
        match self {
            StorageError::DirectoryMissing { path } => {
                format!("Log directory missing: {}", path)
            }
            StorageError::SessionExists { path } => {
                format!("Session file already exists: {}", path)
            }
            StorageError::Io { path, details } => format!("I/O error on {}: {}", path, details),
            StorageError::OutOfOrder {
                previous,
                attempted,
            } => format!(
                "Row at {}s is not after previous row at {}s",
                attempted, previous
            ),
            StorageError::SessionNotFound { path } => {
                format!("Session file not found: {}", path)
            }
            StorageError::InvalidPath { path } => {
                format!("Not a session file: {}", path)
            }
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StorageError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for StorageError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_codes() {
        assert_eq!(
            StorageError::DirectoryMissing {
                path: "x".to_string()
            }
            .code(),
            StorageErrorCodes::DIRECTORY_MISSING
        );
        assert_eq!(
            StorageError::OutOfOrder {
                previous: 600,
                attempted: 300
            }
            .code(),
            StorageErrorCodes::OUT_OF_ORDER
        );
        assert_eq!(
            StorageError::InvalidPath {
                path: "notes.txt".to_string()
            }
            .code(),
            1006
        );
    }

    #[test]
    fn test_storage_error_messages() {
        let err = StorageError::OutOfOrder {
            previous: 600,
            attempted: 300,
        };
        assert_eq!(err.message(), "Row at 300s is not after previous row at 600s");

        let err = StorageError::io(
            Path::new("logs/sleep/42.csv"),
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        assert!(err.message().contains("disk full"));
        assert!(err.message().contains("42.csv"));
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::SessionNotFound {
            path: "logs/sleep/7.csv".to_string(),
        };
        let display = format!("{}", err);
        assert!(display.contains("StorageError"));
        assert!(display.contains("1005"));
    }
}
