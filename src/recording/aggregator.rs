// SampleAggregator - reduces raw accelerometer ticks to one row per store interval
//
// Fixed-size state: three running sums and a sample count. Nothing is
// allocated per sample. When `should_flush` reports true the caller takes the
// row with `flush`, which also resets the window.
//
// Motion metric: arm angle in degrees,
//   angle = atan(mean_z / (mean_x² + mean_y² + ε)), ε = 1e-7

use super::record::{MetaFlag, SessionRecord};

/// Keeps the angle finite when the wrist is perfectly vertical
pub const ANGLE_EPSILON: f64 = 1e-7;

/// Arm angle (degrees) for a mean acceleration vector
pub fn arm_angle(x: f64, y: f64, z: f64) -> f64 {
    (z / (x * x + y * y + ANGLE_EPSILON)).atan().to_degrees()
}

/// Running sums of one aggregation window
#[derive(Debug, Clone)]
pub struct SampleAggregator {
    sums: [f64; 3],
    count: u32,
    threshold: u32,
    pending_meta: MetaFlag,
}

impl SampleAggregator {
    /// `threshold` is the number of samples per row (`store / sample`)
    pub fn new(threshold: u32) -> Self {
        Self {
            sums: [0.0; 3],
            count: 0,
            threshold: threshold.max(1),
            pending_meta: MetaFlag::None,
        }
    }

    pub fn add_sample(&mut self, x: f64, y: f64, z: f64) {
        self.sums[0] += x;
        self.sums[1] += y;
        self.sums[2] += z;
        self.count += 1;
    }

    pub fn should_flush(&self) -> bool {
        self.count >= self.threshold
    }

    /// Attach an event to the row currently being accumulated
    pub fn mark(&mut self, flag: MetaFlag) {
        self.pending_meta = self.pending_meta.merge(flag);
    }

    pub fn pending_meta(&self) -> MetaFlag {
        self.pending_meta
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Mean acceleration of the current window, `None` when empty
    pub fn means(&self) -> Option<[f64; 3]> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some([self.sums[0] / n, self.sums[1] / n, self.sums[2] / n])
    }

    /// Emit the row for this window and reset
    ///
    /// Returns `None` (and still resets) when no sample was accumulated.
    /// The returned record carries no heart rate or meta flag; the caller
    /// decides which optional columns to attach.
    pub fn flush(&mut self, elapsed_s: u32) -> Option<SessionRecord> {
        let record = self
            .means()
            .map(|[x, y, z]| SessionRecord::new(elapsed_s, arm_angle(x, y, z)));
        self.reset();
        record
    }

    /// Take the pending meta flag, clearing it
    pub fn take_meta(&mut self) -> MetaFlag {
        std::mem::take(&mut self.pending_meta)
    }

    /// Discard a partial window
    pub fn reset(&mut self) {
        self.sums = [0.0; 3];
        self.count = 0;
    }
}
