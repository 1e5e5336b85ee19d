//! Configuration management for tracking and analysis parameters
//!
//! This module provides load-time configuration from JSON files so the
//! sampling cadence, the smart alarm window and the signal-processing knobs
//! can be tuned per device without recompilation. Configuration is read once
//! and handed to the session by value; nothing mutates it afterwards.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::TrackingError;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tracking: TrackingConfig,
    pub analysis: AnalysisConfig,
}

/// Sampling, storage and alarm parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Directory holding one CSV file per session (created by the host)
    pub log_dir: PathBuf,
    /// Seconds between two accelerometer readings
    pub sample_interval_s: u32,
    /// Seconds between two persisted rows
    pub store_interval_s: u32,
    /// Tracking stops at or below this battery level (the wake alarm stays)
    pub battery_threshold_percent: u8,
    /// Maximum number of seconds the smart alarm may ring early
    pub anticipate_allowed_s: u32,
    /// Compute an early wake time before the alarm
    pub smart_alarm_enabled: bool,
    /// Extra seconds before the anticipation window at which analysis runs
    pub smart_compute_lead_s: u32,
    /// Minutes before the wake time at which gentle pre-wake pulses fire
    pub gradual_wake_offsets_min: Vec<u16>,
    /// Append a heart-rate column to each row
    pub record_heart_rate: bool,
    /// Append a meta flag column (touches, gradual pulses) to each row
    pub record_meta_flags: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs/sleep"),
            sample_interval_s: 5,
            store_interval_s: 300,
            battery_threshold_percent: 20,
            anticipate_allowed_s: 2400,
            smart_alarm_enabled: true,
            smart_compute_lead_s: 300,
            gradual_wake_offsets_min: vec![1, 2, 3, 4, 5, 8, 13, 20],
            record_heart_rate: false,
            record_meta_flags: true,
        }
    }
}

impl TrackingConfig {
    /// Number of samples accumulated before one row is flushed
    ///
    /// A store interval that is not a multiple of the sample interval is
    /// floored; the result is never below one sample.
    pub fn flush_threshold(&self) -> u32 {
        if self.sample_interval_s == 0 {
            return 1;
        }
        (self.store_interval_s / self.sample_interval_s).max(1)
    }
}

/// Signal-processing parameters for the smart alarm
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Minimum number of rows before analysis is attempted
    pub min_rows: usize,
    /// Upper clip bound as a percentile of the series, in (0, 1]
    pub clip_percentile: f64,
    /// Causal two-point averaging passes (0 disables smoothing)
    pub smoothing_passes: usize,
    /// Standard deviation floor below which the series is degenerate
    pub min_std: f64,
    /// Sliding window used to find local maxima (seconds)
    pub peak_window_s: u32,
    /// Leading portion of the night ignored by the peak search (seconds)
    pub settle_skip_s: u32,
    /// Candidates closer than this many samples are merged
    pub candidate_merge_distance: usize,
    /// Number of representative peaks kept after merging
    pub peak_count_target: usize,
    /// Trailing part of the night searched for peaks; `None` searches it all
    pub peak_horizon_s: Option<u32>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_rows: 6,
            clip_percentile: 0.95,
            smoothing_passes: 5,
            min_std: 1e-6,
            peak_window_s: 3600,
            settle_skip_s: 1800,
            candidate_merge_distance: 2,
            peak_count_target: 4,
            peak_horizon_s: Some(21_600),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// Loaded configuration, or the defaults when the file is missing or
    /// malformed. Missing fields take their default values.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Check invariants the tracking session and processor rely on
    pub fn validate(&self) -> Result<(), TrackingError> {
        let tracking = &self.tracking;
        let analysis = &self.analysis;

        if tracking.sample_interval_s == 0 || tracking.store_interval_s == 0 {
            return Err(TrackingError::InvalidConfig {
                reason: "sample and store intervals must be > 0".to_string(),
            });
        }
        if tracking.store_interval_s < tracking.sample_interval_s {
            return Err(TrackingError::InvalidConfig {
                reason: format!(
                    "store interval {}s is shorter than sample interval {}s",
                    tracking.store_interval_s, tracking.sample_interval_s
                ),
            });
        }
        if tracking.store_interval_s % tracking.sample_interval_s != 0 {
            log::warn!(
                "[Config] store interval {}s is not a multiple of sample interval {}s; flushing every {} samples",
                tracking.store_interval_s,
                tracking.sample_interval_s,
                tracking.flush_threshold()
            );
        }
        if tracking.battery_threshold_percent > 100 {
            return Err(TrackingError::InvalidConfig {
                reason: format!(
                    "battery threshold {}% is above 100%",
                    tracking.battery_threshold_percent
                ),
            });
        }
        if analysis.peak_count_target == 0 {
            return Err(TrackingError::InvalidConfig {
                reason: "peak count target must be > 0".to_string(),
            });
        }
        if !(analysis.clip_percentile > 0.0 && analysis.clip_percentile <= 1.0) {
            return Err(TrackingError::InvalidConfig {
                reason: format!(
                    "clip percentile {} outside (0, 1]",
                    analysis.clip_percentile
                ),
            });
        }
        if analysis.peak_window_s < tracking.store_interval_s {
            return Err(TrackingError::InvalidConfig {
                reason: "peak window must cover at least one stored row".to_string(),
            });
        }
        Ok(())
    }
}
