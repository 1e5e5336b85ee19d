// TrackingSession - one night of tracking driven by scheduled alarms
//
// All work happens in `on_alarm`, invoked by the host scheduler on a single
// execution context: sampling, periodic flush, pre-wake pulses, the smart
// alarm computation and the final ring never overlap.
//
// Every alarm the session schedules is also recorded in `armed`. Stopping
// cancels exactly that set in the same call that marks the session inactive,
// and an alarm that fires while not armed is stale and ignored.

use std::collections::BTreeSet;

use super::device::{Device, PulseKind};
use super::scheduler::{Alarm, Scheduler};
use super::SessionPhase;
use crate::analysis::{SignalProcessor, SleepEstimate, WakeContext};
use crate::config::AppConfig;
use crate::error::{
    log_analysis_error, log_storage_error, log_tracking_error, AnalysisError, ErrorCode,
    TrackingError,
};
use crate::recording::{
    HeartRate, MetaFlag, SampleAggregator, SessionId, SessionRecord, SessionRecorder,
};

/// Smart wake never rings sooner than this after the computation
const SMART_WAKE_MIN_DELAY_S: u64 = 3;

/// Smart wake always rings at least this long before the user alarm
const SMART_WAKE_MIN_ADVANCE_S: u64 = 5;

/// Per-session mutable state
pub struct SessionState {
    pub id: SessionId,
    /// Unix time the session started (origin of elapsed times)
    pub started_at: u64,
    pub wake_at: Option<u64>,
    pub smart_wake_at: Option<u64>,
    aggregator: SampleAggregator,
    /// `None` once recording has stopped (low battery, write failure)
    recorder: Option<SessionRecorder>,
}

impl SessionState {
    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    pub fn rows_written(&self) -> usize {
        self.recorder.as_ref().map_or(0, |r| r.rows_written())
    }
}

/// Tracking session with injected scheduler and device
pub struct TrackingSession<S: Scheduler, D: Device> {
    config: AppConfig,
    processor: SignalProcessor,
    scheduler: S,
    device: D,
    phase: SessionPhase,
    state: Option<SessionState>,
    armed: BTreeSet<(u64, Alarm)>,
    estimate: Option<SleepEstimate>,
}

impl<S: Scheduler, D: Device> TrackingSession<S, D> {
    /// Create an idle session
    ///
    /// # Errors
    /// `InvalidConfig` when the configuration fails validation
    pub fn new(config: AppConfig, scheduler: S, device: D) -> Result<Self, TrackingError> {
        config.validate()?;
        let processor =
            SignalProcessor::new(config.analysis.clone(), config.tracking.store_interval_s);

        Ok(Self {
            config,
            processor,
            scheduler,
            device,
            phase: SessionPhase::Idle,
            state: None,
            armed: BTreeSet::new(),
            estimate: None,
        })
    }

    /// Start tracking now, optionally with a wake alarm at `wake_at`
    pub fn start(&mut self, wake_at: Option<u64>) -> Result<SessionId, TrackingError> {
        if self.phase != SessionPhase::Idle {
            return Err(TrackingError::AlreadyTracking);
        }

        let now = self.device.now();
        if let Some(wake_at) = wake_at {
            if wake_at <= now {
                return Err(TrackingError::InvalidConfig {
                    reason: format!("wake time {} is not after now ({})", wake_at, now),
                });
            }
        }

        // Leftover wake alarms from a session stopped by low battery
        self.cancel_armed(|_| true);

        let id = SessionId(now);
        let recorder = SessionRecorder::open(&self.config.tracking.log_dir, id).map_err(|err| {
            log_storage_error(&err, "start");
            TrackingError::from(err)
        })?;

        self.state = Some(SessionState {
            id,
            started_at: now,
            wake_at,
            smart_wake_at: None,
            aggregator: SampleAggregator::new(self.config.tracking.flush_threshold()),
            recorder: Some(recorder),
        });
        self.estimate = None;
        self.phase = SessionPhase::Tracking;

        self.arm(now + self.config.tracking.sample_interval_s as u64, Alarm::Sample);

        if let Some(wake_at) = wake_at {
            self.arm(wake_at, Alarm::Wake);

            if self.config.tracking.smart_alarm_enabled {
                let lead = self.config.tracking.anticipate_allowed_s as u64
                    + self.config.tracking.smart_compute_lead_s as u64;
                match wake_at.checked_sub(lead) {
                    Some(compute_at) if compute_at > now => {
                        self.arm(compute_at, Alarm::SmartCompute)
                    }
                    _ => log::info!(
                        "[Tracking] Alarm too close for smart wake, keeping plain alarm"
                    ),
                }
            }

            self.arm_gradual_pulses(wake_at, now);
        }

        log::info!(
            "[Tracking] Session {} started (wake_at={:?}, {} alarms armed)",
            id,
            wake_at,
            self.armed.len()
        );
        Ok(id)
    }

    /// Stop tracking and cancel every pending alarm
    ///
    /// A partially accumulated window is discarded.
    pub fn stop(&mut self) -> Result<(), TrackingError> {
        if self.state.is_none() && self.armed.is_empty() {
            return Err(TrackingError::NotTracking);
        }

        let cancelled = self.cancel_armed(|_| true);
        if let Some(state) = self.state.take() {
            log::info!(
                "[Tracking] Session {} stopped ({} rows, {} alarms cancelled)",
                state.id,
                state.rows_written(),
                cancelled
            );
        }
        self.phase = SessionPhase::Idle;
        Ok(())
    }

    /// User silenced the ringing alarm
    pub fn dismiss(&mut self) -> Result<(), TrackingError> {
        if self.phase != SessionPhase::Ringing {
            return Err(TrackingError::NotTracking);
        }
        self.stop()
    }

    /// Flag the row being accumulated with a user touch
    pub fn note_user_touch(&mut self) -> bool {
        match self.state.as_mut() {
            Some(state) if state.is_recording() && self.config.tracking.record_meta_flags => {
                state.aggregator.mark(MetaFlag::UserTouch);
                true
            }
            _ => false,
        }
    }

    /// Dispatch an alarm fired by the scheduler
    ///
    /// # Errors
    /// `Storage` when a row could not be written; recording stops but the
    /// wake alarms stay armed.
    pub fn on_alarm(&mut self, at: u64, alarm: Alarm) -> Result<(), TrackingError> {
        if !self.armed.remove(&(at, alarm)) {
            log::debug!("[Tracking] Ignoring stale alarm {:?} at {}", alarm, at);
            return Ok(());
        }

        match alarm {
            Alarm::Sample => self.on_sample(),
            Alarm::SmartCompute => {
                self.on_smart_compute();
                Ok(())
            }
            Alarm::GradualPulse { offset_min } => {
                self.device.pulse(PulseKind::Gradual);
                log::debug!("[Tracking] Gradual pulse {} min before wake", offset_min);
                if self.config.tracking.record_meta_flags {
                    if let Some(state) = self.state.as_mut() {
                        state.aggregator.mark(MetaFlag::GradualPulse);
                    }
                }
                Ok(())
            }
            Alarm::Wake | Alarm::SmartWake => {
                self.on_wake(alarm);
                Ok(())
            }
        }
    }

    fn on_sample(&mut self) -> Result<(), TrackingError> {
        let now = self.device.now();
        let Some(state) = self.state.as_mut() else {
            return Ok(());
        };
        if !state.is_recording() {
            return Ok(());
        }

        match self.device.read_accel() {
            Ok(reading) => state.aggregator.add_sample(reading.x, reading.y, reading.z),
            Err(err) => log_tracking_error(&err, "on_sample"),
        }

        let elapsed = u32::try_from(now.saturating_sub(state.started_at)).unwrap_or(u32::MAX);
        let mut flush_result = Ok(());

        if state.aggregator.should_flush() {
            if let Some(mut record) = state.aggregator.flush(elapsed) {
                record = self.attach_columns(record);
                flush_result = self.append(record);
            }
        }

        if let Err(err) = flush_result {
            log_tracking_error(&err, "on_sample");
            self.device.notify("Recording failed, tracking stopped");
            self.halt_recording();
            return Err(err);
        }

        let battery = self.device.battery_percent();
        if battery <= self.config.tracking.battery_threshold_percent {
            log::warn!(
                "[Tracking] Battery at {}%, stopping tracking and keeping the alarm",
                battery
            );
            self.device.pulse(PulseKind::LowBattery);
            self.device.notify("Battery low, tracking stopped");
            self.halt_recording();
            return Ok(());
        }

        self.arm(now + self.config.tracking.sample_interval_s as u64, Alarm::Sample);
        Ok(())
    }

    fn attach_columns(&mut self, record: SessionRecord) -> SessionRecord {
        let mut record = record;
        if self.config.tracking.record_heart_rate {
            record = record.with_heart_rate(HeartRate::from(self.device.heart_rate()));
        }
        if self.config.tracking.record_meta_flags {
            if let Some(state) = self.state.as_mut() {
                record = record.with_meta(state.aggregator.take_meta());
            }
        }
        record
    }

    fn append(&mut self, record: SessionRecord) -> Result<(), TrackingError> {
        let Some(recorder) = self.state.as_mut().and_then(|s| s.recorder.as_mut()) else {
            return Ok(());
        };
        recorder.append(&record).map_err(|err| {
            log_storage_error(&err, "append");
            TrackingError::from(err)
        })
    }

    fn on_smart_compute(&mut self) {
        let now = self.device.now();
        let Some((id, started_at, wake_at)) = self
            .state
            .as_ref()
            .and_then(|s| s.wake_at.map(|w| (s.id, s.started_at, w)))
        else {
            return;
        };

        let ctx = WakeContext {
            session_start: started_at,
            wake_at,
            anticipate_allowed_s: self.config.tracking.anticipate_allowed_s,
        };

        let result = SessionRecorder::read_all(
            &self.config.tracking.log_dir,
            id,
            self.config.analysis.min_rows,
        )
        .and_then(|records| {
            self.processor
                .estimate_records(&records, &ctx, &mut self.device)
        });

        match result {
            Ok(estimate) => self.apply_estimate(estimate, wake_at, now),
            Err(err) => self.report_analysis_failure(&err),
        }
    }

    fn apply_estimate(&mut self, estimate: SleepEstimate, wake_at: u64, now: u64) {
        let smart_at = wake_at
            .saturating_sub(estimate.earlier_s)
            .max(now + SMART_WAKE_MIN_DELAY_S)
            .min(wake_at.saturating_sub(SMART_WAKE_MIN_ADVANCE_S));

        self.arm(smart_at, Alarm::SmartWake);
        self.cancel_armed(|alarm| matches!(alarm, Alarm::GradualPulse { .. }));
        self.arm_gradual_pulses(smart_at, now);

        if let Some(state) = self.state.as_mut() {
            state.smart_wake_at = Some(smart_at);
        }

        log::info!(
            "[Tracking] Smart wake at {} ({}s before alarm, cycle {:.0}s)",
            smart_at,
            wake_at.saturating_sub(smart_at),
            estimate.cycle_s
        );
        self.estimate = Some(estimate);
    }

    fn report_analysis_failure(&mut self, err: &AnalysisError) {
        log_analysis_error(err, "smart_compute");
        self.device.notify(&format!(
            "Smart alarm unavailable (code {}), keeping alarm",
            err.code()
        ));
    }

    fn on_wake(&mut self, alarm: Alarm) {
        log::info!("[Tracking] {:?} fired, ringing", alarm);

        // Recording ends once the user is being woken; the remaining wake
        // alarm stays armed until dismissed.
        self.cancel_armed(|a| {
            matches!(
                a,
                Alarm::Sample | Alarm::SmartCompute | Alarm::GradualPulse { .. }
            )
        });
        if let Some(state) = self.state.as_mut() {
            state.aggregator.reset();
            state.recorder = None;
        }
        self.phase = SessionPhase::Ringing;
        self.device.ring();
    }

    /// Stop recording, keeping wake-related alarms armed
    fn halt_recording(&mut self) {
        self.cancel_armed(|alarm| !alarm.is_wake_related());
        if let Some(state) = self.state.as_mut() {
            state.aggregator.reset();
            state.recorder = None;
        }
        self.phase = SessionPhase::Idle;
    }

    fn arm(&mut self, at: u64, alarm: Alarm) {
        self.scheduler.schedule(at, alarm);
        self.armed.insert((at, alarm));
    }

    fn arm_gradual_pulses(&mut self, wake_at: u64, now: u64) {
        let offsets = self.config.tracking.gradual_wake_offsets_min.clone();
        for offset_min in offsets {
            match wake_at.checked_sub(offset_min as u64 * 60) {
                Some(at) if at > now => self.arm(at, Alarm::GradualPulse { offset_min }),
                _ => {}
            }
        }
    }

    /// Cancel armed alarms matching `filter`, returning how many were cancelled
    fn cancel_armed<F: Fn(Alarm) -> bool>(&mut self, filter: F) -> usize {
        let targets: Vec<(u64, Alarm)> = self
            .armed
            .iter()
            .copied()
            .filter(|&(_, alarm)| filter(alarm))
            .collect();
        for (at, alarm) in &targets {
            self.scheduler.cancel(*at, *alarm);
            self.armed.remove(&(*at, *alarm));
        }
        targets.len()
    }

    pub fn is_tracking(&self) -> bool {
        self.phase == SessionPhase::Tracking
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Last successful smart alarm estimate of this session
    pub fn estimate(&self) -> Option<&SleepEstimate> {
        self.estimate.as_ref()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.state.as_ref().map(|s| s.id)
    }

    pub fn state(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    /// Alarms currently armed, ordered by time
    pub fn armed_alarms(&self) -> Vec<(u64, Alarm)> {
        self.armed.iter().copied().collect()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}
