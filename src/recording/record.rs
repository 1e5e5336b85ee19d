// SessionRecord - one persisted row of a tracking session
//
// Row format (comma separated, newline terminated, no header):
//
//   elapsed_seconds,motion_metric[,heart_rate_or_?][,meta_flag]
//
// The heart-rate column is written whenever a reading (or the "?" sentinel)
// is attached. A meta flag without heart rate keeps the column empty
// (`300,1.0000,,1`), so "not recorded" and "no reading" stay distinct.

use std::fmt;

/// Decimal places kept for the motion metric
pub const METRIC_DECIMALS: usize = 4;

/// Literal written when the heart-rate sensor had no reading
pub const UNKNOWN_HEART_RATE: &str = "?";

/// Heart-rate column value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartRate {
    Bpm(u16),
    Unknown,
}

impl From<Option<u16>> for HeartRate {
    fn from(reading: Option<u16>) -> Self {
        reading.map(HeartRate::Bpm).unwrap_or(HeartRate::Unknown)
    }
}

/// Events that happened during the storage interval of a row
///
/// Encoded on disk as 0 (none), 1 (user touch), 2 (gradual wake pulse) or
/// 3 (both).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetaFlag {
    #[default]
    None,
    UserTouch,
    GradualPulse,
    Both,
}

impl MetaFlag {
    pub fn as_u8(self) -> u8 {
        match self {
            MetaFlag::None => 0,
            MetaFlag::UserTouch => 1,
            MetaFlag::GradualPulse => 2,
            MetaFlag::Both => 3,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(MetaFlag::None),
            1 => Some(MetaFlag::UserTouch),
            2 => Some(MetaFlag::GradualPulse),
            3 => Some(MetaFlag::Both),
            _ => None,
        }
    }

    /// Combine two flags (touch + pulse = both)
    pub fn merge(self, other: MetaFlag) -> MetaFlag {
        // bit 0 = touch, bit 1 = pulse
        MetaFlag::from_u8(self.as_u8() | other.as_u8()).unwrap_or(MetaFlag::Both)
    }
}

/// One row of a session file
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    elapsed_s: u32,
    motion: f64,
    heart_rate: Option<HeartRate>,
    meta: Option<MetaFlag>,
}

/// Why a row could not be decoded
#[derive(Debug, Clone, PartialEq)]
pub enum RowError {
    Empty,
    FieldCount(usize),
    Elapsed(String),
    Metric(String),
    HeartRate(String),
    Meta(String),
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowError::Empty => write!(f, "empty row"),
            RowError::FieldCount(n) => write!(f, "expected 2 to 4 fields, got {}", n),
            RowError::Elapsed(v) => write!(f, "bad elapsed seconds {:?}", v),
            RowError::Metric(v) => write!(f, "bad motion metric {:?}", v),
            RowError::HeartRate(v) => write!(f, "bad heart rate {:?}", v),
            RowError::Meta(v) => write!(f, "bad meta flag {:?}", v),
        }
    }
}

impl SessionRecord {
    /// Create a record, rounding the metric to the stored precision so that
    /// encoding and decoding yield the same value.
    pub fn new(elapsed_s: u32, motion: f64) -> Self {
        Self {
            elapsed_s,
            motion: quantize_metric(motion),
            heart_rate: None,
            meta: None,
        }
    }

    /// Seconds since the session started
    pub fn elapsed_s(&self) -> u32 {
        self.elapsed_s
    }

    /// Arm angle in degrees, rounded to [`METRIC_DECIMALS`]
    pub fn motion(&self) -> f64 {
        self.motion
    }

    pub fn heart_rate(&self) -> Option<HeartRate> {
        self.heart_rate
    }

    pub fn meta(&self) -> Option<MetaFlag> {
        self.meta
    }

    pub fn with_heart_rate(mut self, heart_rate: HeartRate) -> Self {
        self.heart_rate = Some(heart_rate);
        self
    }

    pub fn with_meta(mut self, meta: MetaFlag) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Serialize to a newline-terminated row
    pub fn encode(&self) -> String {
        let mut row = format!(
            "{},{:.*}",
            self.elapsed_s, METRIC_DECIMALS, self.motion
        );

        if self.heart_rate.is_some() || self.meta.is_some() {
            row.push(',');
            match self.heart_rate {
                Some(HeartRate::Bpm(bpm)) => row.push_str(&bpm.to_string()),
                Some(HeartRate::Unknown) => row.push_str(UNKNOWN_HEART_RATE),
                None => {}
            }
        }
        if let Some(meta) = self.meta {
            row.push(',');
            row.push_str(&meta.as_u8().to_string());
        }

        row.push('\n');
        row
    }

    /// Parse one row (with or without its trailing newline)
    pub fn decode(line: &str) -> Result<Self, RowError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(RowError::Empty);
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if !(2..=4).contains(&fields.len()) {
            return Err(RowError::FieldCount(fields.len()));
        }

        let elapsed_s = fields[0]
            .parse::<u32>()
            .map_err(|_| RowError::Elapsed(fields[0].to_string()))?;
        let motion = fields[1]
            .parse::<f64>()
            .ok()
            .filter(|m| m.is_finite())
            .ok_or_else(|| RowError::Metric(fields[1].to_string()))?;

        let heart_rate = match fields.get(2) {
            None => None,
            Some(&"") if fields.len() == 4 => None,
            Some(&UNKNOWN_HEART_RATE) => Some(HeartRate::Unknown),
            Some(raw) => Some(HeartRate::Bpm(
                raw.parse::<u16>()
                    .map_err(|_| RowError::HeartRate(raw.to_string()))?,
            )),
        };

        let meta = match fields.get(3) {
            None => None,
            Some(raw) => Some(
                raw.parse::<u8>()
                    .ok()
                    .and_then(MetaFlag::from_u8)
                    .ok_or_else(|| RowError::Meta(raw.to_string()))?,
            ),
        };

        Ok(Self {
            elapsed_s,
            motion,
            heart_rate,
            meta,
        })
    }
}

/// Round a metric to the precision it is stored with
pub fn quantize_metric(value: f64) -> f64 {
    format!("{:.*}", METRIC_DECIMALS, value)
        .parse()
        .unwrap_or(value)
}
