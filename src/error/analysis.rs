// Analysis error types and constants

use crate::error::{ErrorCode, StorageError};
use log::error;
use std::fmt;

/// Analysis error code constants
///
/// Error code range: 2001-2006
pub struct AnalysisErrorCodes {}

impl AnalysisErrorCodes {
    /// Too few rows recorded to analyse
    pub const INSUFFICIENT_DATA: i32 = 2001;

    /// Series has (near) zero variance
    pub const DEGENERATE_SIGNAL: i32 = 2002;

    /// Projected wake time is already past the deadline
    pub const COMPUTATION_TOO_LATE: i32 = 2003;

    /// Not enough peaks to estimate a cycle
    pub const TOO_FEW_PEAKS: i32 = 2004;

    /// Inputs to the processor are inconsistent
    pub const INVALID_INPUT: i32 = 2005;

    /// Session file could not be read
    pub const STORAGE: i32 = 2006;
}

/// Log an analysis error with structured context
///
/// Analysis failures are never fatal: callers log them here and keep the
/// manually set alarm.
pub fn log_analysis_error(err: &AnalysisError, context: &str) {
    error!(
        "Analysis error in {}: code={}, component=SignalProcessor, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Smart alarm analysis errors
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Session holds fewer rows than the pipeline needs
    InsufficientData { required: usize, found: usize },

    /// Standard deviation after centering is below the configured floor
    DegenerateSignal { std_dev: f64 },

    /// `last_peak + cycle` falls after the wake deadline
    ComputationTooLate { projected_wake: u64, deadline: u64 },

    /// Peak search produced fewer peaks than a cycle needs
    TooFewPeaks { required: usize, found: usize },

    /// Inputs are inconsistent (e.g. zero store interval, NaN values)
    InvalidInput { reason: String },

    /// Reading the session failed
    Storage(StorageError),
}

impl From<StorageError> for AnalysisError {
    fn from(err: StorageError) -> Self {
        AnalysisError::Storage(err)
    }
}

impl ErrorCode for AnalysisError {
    fn code(&self) -> i32 {
        match self {
            AnalysisError::InsufficientData { .. } => AnalysisErrorCodes::INSUFFICIENT_DATA,
            AnalysisError::DegenerateSignal { .. } => AnalysisErrorCodes::DEGENERATE_SIGNAL,
            AnalysisError::ComputationTooLate { .. } => AnalysisErrorCodes::COMPUTATION_TOO_LATE,
            AnalysisError::TooFewPeaks { .. } => AnalysisErrorCodes::TOO_FEW_PEAKS,
            AnalysisError::InvalidInput { .. } => AnalysisErrorCodes::INVALID_INPUT,
            AnalysisError::Storage(_) => AnalysisErrorCodes::STORAGE,
        }
    }

    fn message(&self) -> String {
        match self {
            AnalysisError::InsufficientData { required, found } => {
                format!("Insufficient data: need {} rows, got {}", required, found)
            }
            AnalysisError::DegenerateSignal { std_dev } => {
                format!("Degenerate signal: standard deviation {:.3e}", std_dev)
            }
            AnalysisError::ComputationTooLate {
                projected_wake,
                deadline,
            } => format!(
                "Computation too late: projected wake {} is after alarm {}",
                projected_wake, deadline
            ),
            AnalysisError::TooFewPeaks { required, found } => {
                format!("Too few peaks: need {}, found {}", required, found)
            }
            AnalysisError::InvalidInput { reason } => format!("Invalid input: {}", reason),
            AnalysisError::Storage(err) => format!("Storage failure: {}", err.message()),
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AnalysisError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalysisError::Storage(err) => Some(err),
            _ => None,
        }
    }
}
