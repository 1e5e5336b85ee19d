//! Deterministic scheduler + device used to drive a `TrackingSession`
//! without a real timer service or sensors.
//!
//! The scheduler keeps pending alarms in time order; [`run_until`] pops them
//! one by one, moves the device clock to the alarm time and hands the alarm
//! to the session, exactly as a host event loop would.

use std::collections::BTreeSet;
use std::f64::consts::PI;

use crate::analysis::{KeepAwake, PipelineStage};
use crate::error::TrackingError;
use crate::tracking::{AccelReading, Alarm, Device, PulseKind, Scheduler, TrackingSession};

/// Scheduler backed by an ordered set of pending alarms
#[derive(Debug, Default)]
pub struct ManualScheduler {
    pending: BTreeSet<(u64, Alarm)>,
    scheduled_total: usize,
    cancelled_total: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Earliest pending alarm
    pub fn next(&self) -> Option<(u64, Alarm)> {
        self.pending.iter().next().copied()
    }

    /// Remove and return the earliest alarm due at or before `now`
    pub fn pop_due(&mut self, now: u64) -> Option<(u64, Alarm)> {
        let next = self.next()?;
        if next.0 > now {
            return None;
        }
        self.pending.remove(&next);
        Some(next)
    }

    pub fn is_pending(&self, at: u64, alarm: Alarm) -> bool {
        self.pending.contains(&(at, alarm))
    }

    /// Pending times of a given alarm kind
    pub fn times_of(&self, alarm: Alarm) -> Vec<u64> {
        self.pending
            .iter()
            .filter(|(_, a)| *a == alarm)
            .map(|(at, _)| *at)
            .collect()
    }

    pub fn pending(&self) -> Vec<(u64, Alarm)> {
        self.pending.iter().copied().collect()
    }

    pub fn scheduled_total(&self) -> usize {
        self.scheduled_total
    }

    pub fn cancelled_total(&self) -> usize {
        self.cancelled_total
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, at: u64, alarm: Alarm) {
        self.scheduled_total += 1;
        self.pending.insert((at, alarm));
    }

    fn cancel(&mut self, at: u64, alarm: Alarm) -> bool {
        let removed = self.pending.remove(&(at, alarm));
        if removed {
            self.cancelled_total += 1;
        }
        removed
    }
}

type AccelSource = Box<dyn FnMut(u64) -> AccelReading>;

/// Device with a manual clock and scripted sensors
///
/// Every actuator call is recorded so tests can assert on it.
pub struct ScriptedDevice {
    now: u64,
    accel: AccelSource,
    pub battery: u8,
    pub heart_rate: Option<u16>,
    /// Fail every accelerometer read while set
    pub sensor_fault: bool,
    pub pulses: Vec<(u64, PulseKind)>,
    pub rings: Vec<u64>,
    pub notifications: Vec<String>,
    pub lease_stages: Vec<PipelineStage>,
}

impl ScriptedDevice {
    /// Device lying still, face up
    pub fn new(now: u64) -> Self {
        Self {
            now,
            accel: Box::new(|_| AccelReading::new(0.0, 0.0, 1.0)),
            battery: 100,
            heart_rate: None,
            sensor_fault: false,
            pulses: Vec::new(),
            rings: Vec::new(),
            notifications: Vec::new(),
            lease_stages: Vec::new(),
        }
    }

    pub fn with_accel<F>(mut self, source: F) -> Self
    where
        F: FnMut(u64) -> AccelReading + 'static,
    {
        self.accel = Box::new(source);
        self
    }

    pub fn set_now(&mut self, now: u64) {
        self.now = now;
    }
}

impl KeepAwake for ScriptedDevice {
    fn extend_lease(&mut self, stage: PipelineStage) {
        self.lease_stages.push(stage);
    }
}

impl Device for ScriptedDevice {
    fn now(&self) -> u64 {
        self.now
    }

    fn read_accel(&mut self) -> Result<AccelReading, TrackingError> {
        if self.sensor_fault {
            return Err(TrackingError::Sensor {
                details: "scripted accelerometer fault".to_string(),
            });
        }
        Ok((self.accel)(self.now))
    }

    fn heart_rate(&mut self) -> Option<u16> {
        self.heart_rate
    }

    fn battery_percent(&self) -> u8 {
        self.battery
    }

    fn pulse(&mut self, kind: PulseKind) {
        self.pulses.push((self.now, kind));
    }

    fn ring(&mut self) {
        self.rings.push(self.now);
    }

    fn notify(&mut self, message: &str) {
        self.notifications.push(message.to_string());
    }
}

/// Wrist whose tilt follows a sleep cycle
///
/// The vertical component oscillates with period `cycle_s`; its maxima fall
/// at `origin + quarter cycle + k * cycle_s`.
pub fn cyclic_wrist(origin: u64, cycle_s: f64) -> impl FnMut(u64) -> AccelReading {
    move |now| {
        let phase = 2.0 * PI * (now as f64 - origin as f64) / cycle_s;
        AccelReading::new(0.3, 0.2, 0.5 + 0.4 * phase.sin())
    }
}

/// Session driven by the manual harness
pub type HarnessSession = TrackingSession<ManualScheduler, ScriptedDevice>;

/// Fire every alarm due up to `until`, in order, then leave the clock there
///
/// Returns how many alarms were delivered.
pub fn run_until(session: &mut HarnessSession, until: u64) -> Result<usize, TrackingError> {
    let mut fired = 0;
    while let Some((at, alarm)) = session.scheduler_mut().pop_due(until) {
        session.device_mut().set_now(at);
        session.on_alarm(at, alarm)?;
        fired += 1;
    }
    session.device_mut().set_now(until);
    Ok(fired)
}
