// Analysis module - sleep-phase estimation from a recorded session
//
// This module turns the persisted motion series of one night into a single
// "wake up N seconds early" decision for the smart alarm.
//
// Pipeline (each stage feeds the next):
// 1. Clip:          clamp to the configured percentile of the series
// 2. Smooth:        causal two-point averaging, several passes
// 3. Standardize:   zero mean, unit standard deviation
// 4. FindPeaks:     windowed local maxima after the settling period
// 5. MergePeaks:    closest neighbours merged until N peaks remain
// 6. EstimateCycle: mean peak gap × store interval
// 7. Decide:        project last peak + cycle against the alarm window
//
// The processor runs on the same thread as sampling. After every stage it
// extends the host's keep-awake lease so a watchdog does not reclaim the CPU
// mid-computation.

pub mod decision;
pub mod filter;
pub mod peaks;


use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::recording::SessionRecord;

pub use decision::{WakeContext, WakeDecision};
pub use peaks::{Peak, PeakSearch};

/// Pipeline stages reported to the keep-awake lease
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PipelineStage {
    Clip,
    Smooth,
    Standardize,
    FindPeaks,
    MergePeaks,
    EstimateCycle,
    Decide,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 7] = [
        PipelineStage::Clip,
        PipelineStage::Smooth,
        PipelineStage::Standardize,
        PipelineStage::FindPeaks,
        PipelineStage::MergePeaks,
        PipelineStage::EstimateCycle,
        PipelineStage::Decide,
    ];
}

/// Cooperative watchdog lease extended between pipeline stages
pub trait KeepAwake {
    fn extend_lease(&mut self, stage: PipelineStage);
}

/// Lease for hosts without a watchdog
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopKeepAwake;

impl KeepAwake for NoopKeepAwake {
    fn extend_lease(&mut self, _stage: PipelineStage) {}
}

/// Result of one smart-alarm computation
///
/// Recomputed on every run and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SleepEstimate {
    /// Seconds before the alarm to ring instead, in `[0, anticipate_allowed_s]`
    pub earlier_s: u64,
    /// Estimated sleep-cycle length (informational)
    pub cycle_s: f64,
    /// Absolute time of the last surviving peak (unix seconds)
    pub last_peak_at: u64,
    /// `last_peak_at + cycle_s` (unix seconds)
    pub projected_wake: u64,
    /// Projection fell before the anticipation window and was clamped
    pub clamped: bool,
    /// Surviving peaks after merging, in sample-index units
    pub peaks: Vec<Peak>,
    /// Number of rows analysed
    pub samples: usize,
}

/// Offline batch processor for one session's motion series
#[derive(Debug, Clone)]
pub struct SignalProcessor {
    config: AnalysisConfig,
    store_interval_s: u32,
}

impl SignalProcessor {
    /// Create a processor
    ///
    /// # Arguments
    /// * `config` - Filtering and peak-search parameters
    /// * `store_interval_s` - Spacing of the series in seconds
    pub fn new(config: AnalysisConfig, store_interval_s: u32) -> Self {
        Self {
            config,
            store_interval_s,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Window, skip and horizon in samples
    pub fn peak_search(&self) -> PeakSearch {
        let store = self.store_interval_s.max(1) as usize;
        PeakSearch {
            window: self.config.peak_window_s as usize / store,
            skip: self.config.settle_skip_s as usize / store,
            horizon: self.config.peak_horizon_s.map(|h| h as usize / store),
            merge_distance: self.config.candidate_merge_distance,
        }
    }

    /// Run the pipeline on persisted rows
    pub fn estimate_records(
        &self,
        records: &[SessionRecord],
        ctx: &WakeContext,
        lease: &mut dyn KeepAwake,
    ) -> Result<SleepEstimate, AnalysisError> {
        let series: Vec<f64> = records.iter().map(|r| r.motion()).collect();
        self.estimate(&series, ctx, lease)
    }

    /// Run the pipeline on a motion series
    ///
    /// # Errors
    /// * `InsufficientData` - fewer than `min_rows` values
    /// * `InvalidInput` - zero store interval or non-finite values
    /// * `DegenerateSignal` - no variance left after clipping and smoothing
    /// * `TooFewPeaks` - fewer than two peaks survive
    /// * `ComputationTooLate` - the projected wake is after the alarm
    pub fn estimate(
        &self,
        series: &[f64],
        ctx: &WakeContext,
        lease: &mut dyn KeepAwake,
    ) -> Result<SleepEstimate, AnalysisError> {
        if series.len() < self.config.min_rows {
            return Err(AnalysisError::InsufficientData {
                required: self.config.min_rows,
                found: series.len(),
            });
        }
        if self.store_interval_s == 0 {
            return Err(AnalysisError::InvalidInput {
                reason: "store interval is zero".to_string(),
            });
        }
        if let Some(index) = series.iter().position(|v| !v.is_finite()) {
            return Err(AnalysisError::InvalidInput {
                reason: format!("non-finite value at row {}", index),
            });
        }

        let mut data = series.to_vec();

        let bound = filter::clip_upper(&mut data, self.config.clip_percentile);
        tracing::debug!("[Analysis] Clipped {} rows at {:?}", data.len(), bound);
        lease.extend_lease(PipelineStage::Clip);

        filter::smooth(&mut data, self.config.smoothing_passes);
        tracing::debug!("[Analysis] Smoothed ({} passes)", self.config.smoothing_passes);
        lease.extend_lease(PipelineStage::Smooth);

        let std_dev = filter::standardize(&mut data, self.config.min_std)?;
        tracing::debug!("[Analysis] Standardized (std_dev={:.4})", std_dev);
        lease.extend_lease(PipelineStage::Standardize);

        let search = self.peak_search();
        let candidates = peaks::find_candidates(&data, &search);
        tracing::debug!(
            "[Analysis] {} peak candidates (window={}, skip={}, horizon={:?})",
            candidates.len(),
            search.window,
            search.skip,
            search.horizon
        );
        lease.extend_lease(PipelineStage::FindPeaks);

        let merged = peaks::merge_to(candidates, self.config.peak_count_target);
        tracing::debug!("[Analysis] {} peaks after merge: {:?}", merged.len(), merged);
        lease.extend_lease(PipelineStage::MergePeaks);

        let cycle_s = decision::estimate_cycle(&merged, self.store_interval_s)?;
        tracing::debug!("[Analysis] Estimated cycle {:.0}s", cycle_s);
        lease.extend_lease(PipelineStage::EstimateCycle);

        let last_position = merged
            .last()
            .map(|p| p.position)
            .ok_or(AnalysisError::TooFewPeaks {
                required: decision::MIN_PEAKS_FOR_CYCLE,
                found: 0,
            })?;
        let outcome = decision::decide(ctx, last_position, cycle_s, self.store_interval_s);
        lease.extend_lease(PipelineStage::Decide);
        let outcome = outcome?;

        tracing::info!(
            "[Analysis] Wake {}s early (cycle={:.0}s, projected={}, clamped={})",
            outcome.earlier_s,
            cycle_s,
            outcome.projected_wake,
            outcome.clamped
        );

        Ok(SleepEstimate {
            earlier_s: outcome.earlier_s,
            cycle_s,
            last_peak_at: outcome.last_peak_at,
            projected_wake: outcome.projected_wake,
            clamped: outcome.clamped,
            peaks: merged,
            samples: series.len(),
        })
    }
}
