// Recording module - online data reduction and session persistence
//
// Sensor ticks → SampleAggregator (running sums) → SessionRecord per store
// interval → SessionRecorder (append-only file, one per session).

pub mod aggregator;
pub mod record;
pub mod recorder;

pub use aggregator::{arm_angle, SampleAggregator};
pub use record::{HeartRate, MetaFlag, SessionRecord};
pub use recorder::{list_sessions, SessionId, SessionRead, SessionRecorder};
