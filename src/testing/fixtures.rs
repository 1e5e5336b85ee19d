//! Synthetic night fixtures for the analysis pipeline and the CLI.
//!
//! A night is modelled as a sinusoidal arm-angle trace whose period is the
//! sleep cycle, plus uniform noise from a seeded `StdRng` so every run of a
//! test or simulation produces the same file.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::recording::{SessionId, SessionRecord, SessionRecorder};

/// Declarative description of a synthetic night
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NightSpec {
    /// Number of stored rows
    pub rows: usize,
    #[serde(default = "default_store_interval")]
    pub store_interval_s: u32,
    /// Period of the movement cycle
    #[serde(default = "default_cycle")]
    pub cycle_s: f64,
    /// Peak deviation of the arm angle (degrees)
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
    /// Uniform noise half-width (degrees)
    #[serde(default = "default_noise")]
    pub noise: f64,
    /// Mean arm angle (degrees)
    #[serde(default)]
    pub baseline: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_store_interval() -> u32 {
    300
}

fn default_cycle() -> f64 {
    5400.0
}

fn default_amplitude() -> f64 {
    20.0
}

fn default_noise() -> f64 {
    2.0
}

fn default_seed() -> u64 {
    42
}

impl Default for NightSpec {
    fn default() -> Self {
        Self {
            rows: 200,
            store_interval_s: default_store_interval(),
            cycle_s: default_cycle(),
            amplitude: default_amplitude(),
            noise: default_noise(),
            baseline: 0.0,
            seed: default_seed(),
        }
    }
}

impl NightSpec {
    /// Night covering `hours` at the default store interval
    pub fn for_hours(hours: f64, seed: u64) -> Self {
        let store = default_store_interval();
        Self {
            rows: ((hours * 3600.0) / store as f64).floor().max(0.0) as usize,
            seed,
            ..Self::default()
        }
    }

    /// Motion values, one per stored row
    pub fn series(&self) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let samples_per_cycle = self.cycle_s / self.store_interval_s.max(1) as f64;

        (0..self.rows)
            .map(|i| {
                let phase = 2.0 * PI * i as f64 / samples_per_cycle;
                let noise = if self.noise > 0.0 {
                    rng.gen_range(-self.noise..self.noise)
                } else {
                    0.0
                };
                self.baseline + self.amplitude * phase.sin() + noise
            })
            .collect()
    }

    /// Rows as the aggregator would emit them (first row after one interval)
    pub fn records(&self) -> Vec<SessionRecord> {
        self.series()
            .into_iter()
            .enumerate()
            .map(|(i, motion)| SessionRecord::new((i as u32 + 1) * self.store_interval_s, motion))
            .collect()
    }

    /// Write the night through the recorder into `log_dir`
    pub fn write_session(&self, log_dir: &Path, id: SessionId) -> Result<PathBuf, StorageError> {
        let mut recorder = SessionRecorder::open(log_dir, id)?;
        for record in self.records() {
            recorder.append(&record)?;
        }
        Ok(recorder.path().to_path_buf())
    }
}

/// A flat night: every row carries the same angle
pub fn constant_records(rows: usize, store_interval_s: u32, motion: f64) -> Vec<SessionRecord> {
    (1..=rows as u32)
        .map(|i| SessionRecord::new(i * store_interval_s, motion))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_is_deterministic() {
        let spec = NightSpec::default();
        assert_eq!(spec.series(), spec.series());

        let other = NightSpec {
            seed: 7,
            ..NightSpec::default()
        };
        assert_ne!(spec.series(), other.series());
    }

    #[test]
    fn test_series_shape() {
        let spec = NightSpec {
            rows: 36,
            noise: 0.0,
            ..NightSpec::default()
        };
        let series = spec.series();
        assert_eq!(series.len(), 36);
        // quarter cycle = 4.5 rows at 300 s; row 0 is the zero crossing
        assert!(series[0].abs() < 1e-9);
        assert!(series.iter().all(|v| v.abs() <= spec.amplitude + 1e-9));
    }

    #[test]
    fn test_records_elapsed_increase() {
        let records = NightSpec::for_hours(2.0, 1).records();
        assert_eq!(records.len(), 24);
        assert_eq!(records[0].elapsed_s(), 300);
        assert!(records.windows(2).all(|w| w[1].elapsed_s() > w[0].elapsed_s()));
    }

    #[test]
    fn test_constant_records() {
        let records = constant_records(6, 300, 12.0);
        assert_eq!(records.len(), 6);
        assert!(records.iter().all(|r| r.motion() == 12.0));
        assert_eq!(records[5].elapsed_s(), 1800);
    }
}
