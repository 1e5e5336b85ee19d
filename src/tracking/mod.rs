//! Tracking session lifecycle.
//!
//! [`TrackingSession`] owns the state of one night and reacts to the alarms
//! it schedules through an injected [`Scheduler`]. Sensors and actuators are
//! reached through [`Device`].

mod device;
mod scheduler;
mod session;

pub use device::{AccelReading, Device, PulseKind};
pub use scheduler::{Alarm, Scheduler};
pub use session::{SessionState, TrackingSession};

use serde::Serialize;

const SECONDS_PER_DAY: u64 = 86_400;

/// Lifecycle phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    /// Not recording. Wake alarms may still be armed after a low-battery stop.
    Idle,
    Tracking,
    Ringing,
}

/// Next occurrence of `hour:minute` strictly after `now`
///
/// `now` is in local seconds (unix time shifted by the UTC offset); the
/// result is in the same frame. A time that has already passed today is
/// moved to tomorrow.
pub fn next_wake_time(hour: u8, minute: u8, now: u64) -> u64 {
    let day_start = now - now % SECONDS_PER_DAY;
    let target = day_start + (hour as u64 % 24) * 3600 + (minute as u64 % 60) * 60;
    if target <= now {
        target + SECONDS_PER_DAY
    } else {
        target
    }
}
