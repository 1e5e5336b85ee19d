// Error types for the sleep tracker
//
// This module defines custom error types for storage, analysis and tracking
// operations, providing structured error handling with numeric codes that a
// host UI layer can map to notifications.

mod analysis;
mod storage;
mod tracking;

pub use analysis::{log_analysis_error, AnalysisError, AnalysisErrorCodes};
pub use storage::{log_storage_error, StorageError, StorageErrorCodes};
pub use tracking::{log_tracking_error, TrackingError, TrackingErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the host boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
