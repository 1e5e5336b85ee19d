// Series conditioning: outlier clip, causal smoothing, standardization
//
// All functions work in place on the motion series and are linear in its
// length apart from the single sort used by the percentile.

use crate::error::AnalysisError;

/// Nearest-rank percentile of a series (`p` in (0, 1])
///
/// Returns `None` for an empty series.
pub fn percentile(data: &[f64], p: f64) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (p.clamp(0.0, 1.0) * sorted.len() as f64).ceil() as usize;
    let index = rank.saturating_sub(1).min(sorted.len() - 1);
    Some(sorted[index])
}

/// Clamp every value to the `p` percentile of the series
///
/// Returns the bound that was applied.
pub fn clip_upper(data: &mut [f64], p: f64) -> Option<f64> {
    let bound = percentile(data, p)?;
    for value in data.iter_mut() {
        if *value > bound {
            *value = bound;
        }
    }
    Some(bound)
}

/// Causal two-point average, `passes` times, left to right
///
/// Each pass sets `d[i] = (d[i] + d[i-1]) / 2` for `i >= 1`, reading the
/// already updated `d[i-1]`. Zero passes leaves the series untouched.
pub fn smooth(data: &mut [f64], passes: usize) {
    for _ in 0..passes {
        for i in 1..data.len() {
            data[i] = (data[i] + data[i - 1]) / 2.0;
        }
    }
}

/// Subtract the mean and divide by the standard deviation
///
/// The deviation is `sqrt(mean(x²) - mean(x)²)` over the centered series.
/// A deviation below `min_std` means there is nothing left to find peaks in.
///
/// # Returns
/// The standard deviation the series was divided by
pub fn standardize(data: &mut [f64], min_std: f64) -> Result<f64, AnalysisError> {
    if data.is_empty() {
        return Err(AnalysisError::InsufficientData {
            required: 1,
            found: 0,
        });
    }

    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    for value in data.iter_mut() {
        *value -= mean;
    }

    let centered_mean = data.iter().sum::<f64>() / n;
    let mean_sq = data.iter().map(|v| v * v).sum::<f64>() / n;
    let std_dev = (mean_sq - centered_mean * centered_mean).max(0.0).sqrt();

    if !(std_dev >= min_std) {
        return Err(AnalysisError::DegenerateSignal { std_dev });
    }

    for value in data.iter_mut() {
        *value /= std_dev;
    }
    Ok(std_dev)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_nearest_rank() {
        let data: Vec<f64> = (1..=20).map(f64::from).collect();
        assert_eq!(percentile(&data, 0.95), Some(19.0));
        assert_eq!(percentile(&data, 1.0), Some(20.0));
        assert_eq!(percentile(&data, 0.5), Some(10.0));
        assert_eq!(percentile(&[], 0.95), None);
        assert_eq!(percentile(&[3.0], 0.01), Some(3.0));
    }

    #[test]
    fn test_clip_suppresses_spike() {
        let mut data = vec![1.0; 19];
        data.push(90.0);
        let bound = clip_upper(&mut data, 0.95).unwrap();
        assert_eq!(bound, 1.0);
        assert!(data.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_smooth_single_pass() {
        let mut data = vec![0.0, 4.0, 0.0, 4.0];
        smooth(&mut data, 1);
        // d1 = (4+0)/2 = 2, d2 = (0+2)/2 = 1, d3 = (4+1)/2 = 2.5
        assert_eq!(data, vec![0.0, 2.0, 1.0, 2.5]);
    }

    #[test]
    fn test_smooth_zero_passes_is_identity() {
        let mut data = vec![3.0, -1.0, 7.0];
        smooth(&mut data, 0);
        assert_eq!(data, vec![3.0, -1.0, 7.0]);
    }

    #[test]
    fn test_standardize_unit_variance() {
        let mut data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let std_dev = standardize(&mut data, 1e-6).unwrap();
        assert!((std_dev - 2f64.sqrt()).abs() < 1e-12);

        let mean: f64 = data.iter().sum::<f64>() / data.len() as f64;
        let var: f64 = data.iter().map(|v| v * v).sum::<f64>() / data.len() as f64;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_standardize_constant_series_is_degenerate() {
        let mut data = vec![0.1; 6];
        match standardize(&mut data, 1e-6) {
            Err(AnalysisError::DegenerateSignal { std_dev }) => assert!(std_dev < 1e-6),
            other => panic!("expected DegenerateSignal, got {:?}", other),
        }
    }
}
