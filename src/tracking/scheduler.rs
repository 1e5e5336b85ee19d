//! Alarm scheduling capability consumed by the tracking session.

use serde::Serialize;

/// Callbacks the session arranges for itself
///
/// Alarms are identified by `(absolute time, Alarm)`; cancelling needs the
/// same pair that was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Alarm {
    /// Take one accelerometer sample
    Sample,
    /// User-set alarm
    Wake,
    /// Run the smart alarm computation
    SmartCompute,
    /// Early alarm chosen by the smart alarm
    SmartWake,
    /// Gentle pre-wake pulse `offset_min` minutes before the alarm
    GradualPulse { offset_min: u16 },
}

impl Alarm {
    /// Alarms that must survive a low-battery stop
    pub fn is_wake_related(self) -> bool {
        matches!(
            self,
            Alarm::Wake | Alarm::SmartWake | Alarm::GradualPulse { .. }
        )
    }
}

/// Host timer service
///
/// Implementations invoke `TrackingSession::on_alarm(at, alarm)` once the
/// wall clock reaches `at`.
pub trait Scheduler {
    /// Arrange for `alarm` to fire at unix time `at`
    fn schedule(&mut self, at: u64, alarm: Alarm);

    /// Cancel a previously scheduled alarm, returning whether it was pending
    fn cancel(&mut self, at: u64, alarm: Alarm) -> bool;
}
