// Tracking session error types and constants

use crate::error::{ErrorCode, StorageError};
use log::error;
use std::fmt;

/// Tracking error code constants
///
/// Error code range: 3001-3005
pub struct TrackingErrorCodes {}

impl TrackingErrorCodes {
    /// A session is already running
    pub const ALREADY_TRACKING: i32 = 3001;

    /// No session is running
    pub const NOT_TRACKING: i32 = 3002;

    /// Configuration was rejected
    pub const INVALID_CONFIG: i32 = 3003;

    /// Recording failed and tracking stopped
    pub const STORAGE: i32 = 3004;

    /// Sensor driver failed to deliver a reading
    pub const SENSOR: i32 = 3005;
}

/// Log a tracking error with structured context
pub fn log_tracking_error(err: &TrackingError, context: &str) {
    error!(
        "Tracking error in {}: code={}, component=TrackingSession, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Tracking session lifecycle errors
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingError {
    /// `start` called while a session is active
    AlreadyTracking,

    /// Operation needs an active session
    NotTracking,

    /// Configuration failed validation
    InvalidConfig { reason: String },

    /// Session file could not be written
    Storage(StorageError),

    /// Sensor read failed
    Sensor { details: String },
}

impl From<StorageError> for TrackingError {
    fn from(err: StorageError) -> Self {
        TrackingError::Storage(err)
    }
}

impl ErrorCode for TrackingError {
    fn code(&self) -> i32 {
        match self {
            TrackingError::AlreadyTracking => TrackingErrorCodes::ALREADY_TRACKING,
            TrackingError::NotTracking => TrackingErrorCodes::NOT_TRACKING,
            TrackingError::InvalidConfig { .. } => TrackingErrorCodes::INVALID_CONFIG,
            TrackingError::Storage(_) => TrackingErrorCodes::STORAGE,
            TrackingError::Sensor { .. } => TrackingErrorCodes::SENSOR,
        }
    }

    fn message(&self) -> String {
        match self {
            TrackingError::AlreadyTracking => {
                "Tracking already running. Call stop() first.".to_string()
            }
            TrackingError::NotTracking => "Tracking not running. Call start() first.".to_string(),
            TrackingError::InvalidConfig { reason } => format!("Invalid config: {}", reason),
            TrackingError::Storage(err) => format!("Recording failed: {}", err.message()),
            TrackingError::Sensor { details } => format!("Sensor error: {}", details),
        }
    }
}

impl fmt::Display for TrackingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TrackingError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for TrackingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrackingError::Storage(err) => Some(err),
            _ => None,
        }
    }
}
