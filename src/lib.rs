// Sleep Tracker Core - sleep-phase estimation for a wearable
// Online accelerometer reduction, append-only session files and an offline
// smart alarm that wakes the user near a light-sleep peak.

// Module declarations
pub mod analysis;
pub mod config;
pub mod error;
pub mod recording;
pub mod testing;
pub mod tracking;

// Re-exports for convenience
pub use analysis::{KeepAwake, NoopKeepAwake, SignalProcessor, SleepEstimate, WakeContext};
pub use config::AppConfig;
pub use error::{AnalysisError, ErrorCode, StorageError, TrackingError};
pub use recording::{SampleAggregator, SessionId, SessionRecord, SessionRecorder};
pub use tracking::{Alarm, Device, Scheduler, SessionPhase, TrackingSession};

/// Install the fmt subscriber for `tracing` and `log` output
///
/// Output goes to stderr so command output on stdout stays machine readable.
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    if tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
    {
        log::debug!("[Logging] fmt subscriber installed");
    }
}
