//! Device capabilities consumed by the tracking session.
//!
//! Sensor drivers, actuators and the notification surface belong to the
//! host. The session only talks to them through [`Device`], so tests can
//! substitute a scripted device with a manual clock.

use crate::analysis::KeepAwake;
use crate::error::TrackingError;

/// One raw accelerometer reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelReading {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AccelReading {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Vibration patterns the session asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseKind {
    /// Short, low-intensity pre-wake pulse
    Gradual,
    /// Tracking stopped because the battery ran low
    LowBattery,
}

/// Clock, sensors and actuators of the wearable
///
/// The keep-awake lease is part of the device so the smart alarm can keep
/// the CPU awake while it runs.
pub trait Device: KeepAwake {
    /// Current wall-clock time (unix seconds)
    fn now(&self) -> u64;

    fn read_accel(&mut self) -> Result<AccelReading, TrackingError>;

    /// Heart rate in bpm, `None` when the sensor has no reading
    fn heart_rate(&mut self) -> Option<u16>;

    fn battery_percent(&self) -> u8;

    fn pulse(&mut self, kind: PulseKind);

    /// Start the alarm ringing
    fn ring(&mut self);

    /// Show a short message to the user
    fn notify(&mut self, message: &str);
}
