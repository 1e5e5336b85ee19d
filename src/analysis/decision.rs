// Cycle estimate and the deadline-bounded wake decision

use super::peaks::Peak;
use crate::error::AnalysisError;

/// Peaks needed to measure a gap
pub const MIN_PEAKS_FOR_CYCLE: usize = 2;

/// Mean gap between consecutive peaks, in seconds
pub fn estimate_cycle(peaks: &[Peak], store_interval_s: u32) -> Result<f64, AnalysisError> {
    if peaks.len() < MIN_PEAKS_FOR_CYCLE {
        return Err(AnalysisError::TooFewPeaks {
            required: MIN_PEAKS_FOR_CYCLE,
            found: peaks.len(),
        });
    }

    let first = peaks[0].position;
    let last = peaks[peaks.len() - 1].position;
    let mean_gap = (last - first) / (peaks.len() - 1) as f64;
    Ok(mean_gap * store_interval_s as f64)
}

/// Timing inputs for one decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeContext {
    /// Session start (unix seconds), origin of the series
    pub session_start: u64,
    /// Alarm time set by the user (unix seconds)
    pub wake_at: u64,
    /// Maximum number of seconds the alarm may be moved earlier
    pub anticipate_allowed_s: u32,
}

/// Outcome of the decision policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WakeDecision {
    /// Seconds before `wake_at` to ring instead, in `[0, anticipate_allowed_s]`
    pub earlier_s: u64,
    /// Absolute time of the last surviving peak
    pub last_peak_at: u64,
    /// `last_peak_at + cycle`
    pub projected_wake: u64,
    /// True when the projection fell before the window and was clamped
    pub clamped: bool,
}

/// Decide how early to ring
///
/// * projected after `wake_at` → `ComputationTooLate`
/// * projected before `wake_at - anticipate` → ring `anticipate` early
/// * otherwise ring at the projected peak
pub fn decide(
    ctx: &WakeContext,
    last_peak_position: f64,
    cycle_s: f64,
    store_interval_s: u32,
) -> Result<WakeDecision, AnalysisError> {
    if !cycle_s.is_finite() || !last_peak_position.is_finite() {
        return Err(AnalysisError::InvalidInput {
            reason: format!(
                "non-finite peak position {} or cycle {}",
                last_peak_position, cycle_s
            ),
        });
    }

    let last_peak_abs = ctx.session_start as f64 + last_peak_position * store_interval_s as f64;
    let projected = last_peak_abs + cycle_s;
    let wake_at = ctx.wake_at as f64;
    let anticipate = ctx.anticipate_allowed_s as f64;

    let last_peak_at = last_peak_abs.round().max(0.0) as u64;
    let projected_wake = projected.round().max(0.0) as u64;

    if projected > wake_at {
        return Err(AnalysisError::ComputationTooLate {
            projected_wake,
            deadline: ctx.wake_at,
        });
    }

    let (earlier, clamped) = if projected < wake_at - anticipate {
        (anticipate, true)
    } else {
        ((wake_at - projected).round().clamp(0.0, anticipate), false)
    };

    Ok(WakeDecision {
        earlier_s: earlier as u64,
        last_peak_at,
        projected_wake,
        clamped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peaks_at(positions: &[f64]) -> Vec<Peak> {
        positions
            .iter()
            .map(|&position| Peak {
                position,
                value: 1.0,
            })
            .collect()
    }

    #[test]
    fn test_cycle_is_mean_gap() {
        let peaks = peaks_at(&[10.0, 28.0, 46.0, 64.0]);
        assert_eq!(estimate_cycle(&peaks, 300).unwrap(), 5400.0);

        let peaks = peaks_at(&[0.0, 10.0, 30.0]);
        assert_eq!(estimate_cycle(&peaks, 120).unwrap(), 1800.0);
    }

    #[test]
    fn test_single_peak_has_no_cycle() {
        match estimate_cycle(&peaks_at(&[3.0]), 300) {
            Err(AnalysisError::TooFewPeaks { required, found }) => {
                assert_eq!(required, 2);
                assert_eq!(found, 1);
            }
            other => panic!("expected TooFewPeaks, got {:?}", other),
        }
    }

    const START: u64 = 1_700_000_000;

    fn ctx(wake_offset: u64) -> WakeContext {
        WakeContext {
            session_start: START,
            wake_at: START + wake_offset,
            anticipate_allowed_s: 2400,
        }
    }

    #[test]
    fn test_projection_before_window_is_clamped() {
        // last peak at 20 * 300 = 6000 s, projected 11400 s, wake at 30000 s
        let decision = decide(&ctx(30_000), 20.0, 5400.0, 300).unwrap();
        assert_eq!(decision.earlier_s, 2400);
        assert!(decision.clamped);
        assert_eq!(decision.projected_wake, START + 11_400);
    }

    #[test]
    fn test_projection_inside_window() {
        // projected 11400 s, wake at 12000 s → 600 s early
        let decision = decide(&ctx(12_000), 20.0, 5400.0, 300).unwrap();
        assert_eq!(decision.earlier_s, 600);
        assert!(!decision.clamped);
        assert_eq!(decision.last_peak_at, START + 6000);
    }

    #[test]
    fn test_projection_exactly_at_wake_time() {
        let decision = decide(&ctx(11_400), 20.0, 5400.0, 300).unwrap();
        assert_eq!(decision.earlier_s, 0);
    }

    #[test]
    fn test_projection_after_wake_time_is_too_late() {
        match decide(&ctx(11_000), 20.0, 5400.0, 300) {
            Err(AnalysisError::ComputationTooLate {
                projected_wake,
                deadline,
            }) => {
                assert_eq!(projected_wake, START + 11_400);
                assert_eq!(deadline, START + 11_000);
            }
            other => panic!("expected ComputationTooLate, got {:?}", other),
        }
    }

    #[test]
    fn test_fractional_position_rounds_earlier() {
        // last peak at 20.5 * 300 = 6150 s, projected 11550 s, wake 12000 s
        let decision = decide(&ctx(12_000), 20.5, 5400.0, 300).unwrap();
        assert_eq!(decision.earlier_s, 450);
    }
}
