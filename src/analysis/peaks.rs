// Peak search on the standardized motion series
//
// 1. Slide a window over the searchable part of the series; the window's
//    maximum is a candidate when it lies strictly inside the window and is
//    positive.
// 2. Candidates closer than `merge_distance` samples collapse into the
//    higher one.
// 3. While more than N peaks remain, the two temporally closest neighbours
//    merge into one (positions averaged, values summed).

use serde::Serialize;

/// A peak in sample-index units
///
/// `position` becomes fractional once two peaks have been merged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Peak {
    pub position: f64,
    pub value: f64,
}

/// Search parameters, already converted from seconds to samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeakSearch {
    pub window: usize,
    pub skip: usize,
    pub horizon: Option<usize>,
    pub merge_distance: usize,
}

impl PeakSearch {
    /// First index the search may look at
    pub fn start(&self, len: usize) -> usize {
        let horizon_start = self
            .horizon
            .map(|h| len.saturating_sub(h))
            .unwrap_or(0);
        self.skip.max(horizon_start)
    }
}

/// Windowed local maxima with near-duplicate suppression
pub fn find_candidates(data: &[f64], search: &PeakSearch) -> Vec<Peak> {
    let window = search.window;
    let start = search.start(data.len());
    // An interior index needs at least three samples
    if window < 3 || data.len() < start + window {
        return Vec::new();
    }

    let mut kept: Vec<(usize, f64)> = Vec::new();

    for win_start in start..=(data.len() - window) {
        let slice = &data[win_start..win_start + window];
        let (offset, value) = slice
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, v)| {
                if v > best.1 {
                    (i, v)
                } else {
                    best
                }
            });

        if offset == 0 || offset == window - 1 || value <= 0.0 {
            continue;
        }
        let index = win_start + offset;

        match kept.last_mut() {
            Some(last) if last.0 == index => {}
            Some(last) if index - last.0 < search.merge_distance => {
                if value > last.1 {
                    *last = (index, value);
                }
            }
            _ => kept.push((index, value)),
        }
    }

    kept.into_iter()
        .map(|(index, value)| Peak {
            position: index as f64,
            value,
        })
        .collect()
}

/// Merge the closest neighbouring peaks until at most `target` remain
pub fn merge_to(mut peaks: Vec<Peak>, target: usize) -> Vec<Peak> {
    let target = target.max(1);
    while peaks.len() > target {
        let closest = peaks
            .windows(2)
            .enumerate()
            .map(|(i, pair)| (i, pair[1].position - pair[0].position))
            .fold((0, f64::INFINITY), |best, (i, gap)| {
                if gap < best.1 {
                    (i, gap)
                } else {
                    best
                }
            })
            .0;

        let right = peaks.remove(closest + 1);
        let left = &mut peaks[closest];
        left.position = (left.position + right.position) / 2.0;
        left.value += right.value;
    }
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search(window: usize, skip: usize) -> PeakSearch {
        PeakSearch {
            window,
            skip,
            horizon: None,
            merge_distance: 2,
        }
    }

    #[test]
    fn test_single_interior_peak() {
        let data = [0.0, 0.5, 2.0, 0.5, 0.0, -1.0];
        let peaks = find_candidates(&data, &search(4, 0));
        assert_eq!(
            peaks,
            vec![Peak {
                position: 2.0,
                value: 2.0
            }]
        );
    }

    #[test]
    fn test_edge_maxima_are_not_candidates() {
        // monotonically rising: every window max sits on its right edge
        let data: Vec<f64> = (0..10).map(|i| i as f64).collect();
        assert!(find_candidates(&data, &search(4, 0)).is_empty());
    }

    #[test]
    fn test_non_positive_maxima_rejected() {
        let data = [-3.0, -2.0, -0.5, -2.0, -3.0];
        assert!(find_candidates(&data, &search(3, 0)).is_empty());
    }

    #[test]
    fn test_skip_ignores_settling_period() {
        let data = [0.0, 5.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        let peaks = find_candidates(&data, &search(3, 3));
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].position, 5.0);
    }

    #[test]
    fn test_horizon_limits_search_to_trailing_samples() {
        let data = [0.0, 5.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        let mut s = search(3, 0);
        s.horizon = Some(4);
        let peaks = find_candidates(&data, &s);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].position, 5.0);
    }

    #[test]
    fn test_adjacent_candidates_keep_higher() {
        // windows of 3 see index 3 then index 5 as interior maxima
        let data = [0.0, 0.0, 0.0, 1.0, 0.5, 2.0, 0.0, 0.0];
        let peaks = find_candidates(&data, &search(3, 0));
        assert_eq!(
            peaks,
            vec![
                Peak {
                    position: 3.0,
                    value: 1.0
                },
                Peak {
                    position: 5.0,
                    value: 2.0
                }
            ]
        );

        let mut s = search(3, 0);
        s.merge_distance = 3;
        let peaks = find_candidates(&data, &s);
        assert_eq!(
            peaks,
            vec![Peak {
                position: 5.0,
                value: 2.0
            }]
        );
    }

    #[test]
    fn test_short_series_has_no_candidates() {
        assert!(find_candidates(&[1.0, 2.0], &search(12, 0)).is_empty());
        assert!(find_candidates(&[0.0, 1.0, 0.0], &search(2, 0)).is_empty());
    }

    #[test]
    fn test_merge_closest_pair_first() {
        let peaks = vec![
            Peak {
                position: 0.0,
                value: 1.0,
            },
            Peak {
                position: 10.0,
                value: 1.0,
            },
            Peak {
                position: 12.0,
                value: 2.0,
            },
            Peak {
                position: 30.0,
                value: 1.0,
            },
        ];

        let merged = merge_to(peaks, 3);
        assert_eq!(merged.len(), 3);
        assert_eq!(
            merged[1],
            Peak {
                position: 11.0,
                value: 3.0
            }
        );
        assert_eq!(merged[2].position, 30.0);
    }

    #[test]
    fn test_merge_noop_when_under_target() {
        let peaks = vec![Peak {
            position: 4.0,
            value: 1.0,
        }];
        assert_eq!(merge_to(peaks.clone(), 4), peaks);
    }
}
