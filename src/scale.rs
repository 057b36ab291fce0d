//! Threshold classification of continuous values into palette buckets.

use thiserror::Error;

/// Nine-step sequential orange palette, light to dark.
pub const ORANGES_9: [&str; 9] = [
    "#fff5eb", "#fee6ce", "#fdd0a2", "#fdae6b", "#fd8d3c", "#f16913", "#d94801", "#a63603", "#7f2704",
];

#[derive(Debug, Error, PartialEq)]
pub enum ScaleError {
    #[error("palette has {available} colors but {needed} buckets need one each")]
    PaletteTooShort { needed: usize, available: usize },
    #[error("breakpoints must be in ascending order")]
    Unordered,
    #[error("cannot build a scale over an empty domain")]
    EmptyDomain,
}

/// Minimum and maximum of the finite values, or `None` when there are none.
pub fn extent<I: IntoIterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Start of each of `intervals` equal-width slices of `[min, max)`.
///
/// The first breakpoint is the minimum itself. A zero-width range has no
/// breakpoints.
pub fn equal_breaks((min, max): (f64, f64), intervals: usize) -> Vec<f64> {
    if intervals == 0 || max <= min {
        return Vec::new();
    }
    let step = (max - min) / intervals as f64;
    (0..intervals).map(|i| min + i as f64 * step).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdScale {
    extent: (f64, f64),
    breaks: Vec<f64>,
    colors: Vec<String>,
}

impl ThresholdScale {
    pub fn with_breaks(extent: (f64, f64), breaks: Vec<f64>, palette: &[String]) -> Result<Self, ScaleError> {
        if breaks.windows(2).any(|w| w[0] > w[1]) {
            return Err(ScaleError::Unordered);
        }
        let needed = breaks.len() + 1;
        if palette.len() < needed {
            return Err(ScaleError::PaletteTooShort {
                needed,
                available: palette.len(),
            });
        }
        Ok(Self {
            extent,
            breaks,
            colors: palette[..needed].to_vec(),
        })
    }

    /// Split the observed range into `intervals` equal slices.
    pub fn equal_interval(extent: Option<(f64, f64)>, intervals: usize, palette: &[String]) -> Result<Self, ScaleError> {
        let extent = extent.ok_or(ScaleError::EmptyDomain)?;
        Self::with_breaks(extent, equal_breaks(extent, intervals), palette)
    }

    /// Bucket index for a value; a value on a breakpoint belongs to the bucket
    /// that starts there.
    pub fn bucket(&self, value: f64) -> usize {
        self.breaks.partition_point(|b| *b <= value)
    }

    pub fn color(&self, value: f64) -> &str {
        self.bucket_color(self.bucket(value))
    }

    pub fn bucket_color(&self, bucket: usize) -> &str {
        &self.colors[bucket.min(self.colors.len() - 1)]
    }

    pub fn bucket_count(&self) -> usize {
        self.colors.len()
    }

    pub fn breaks(&self) -> &[f64] {
        &self.breaks
    }

    pub fn extent(&self) -> (f64, f64) {
        self.extent
    }

    /// Domain span of a bucket. The outermost buckets are open on one side.
    pub fn invert_extent(&self, bucket: usize) -> (Option<f64>, Option<f64>) {
        let lo = bucket.checked_sub(1).and_then(|i| self.breaks.get(i)).copied();
        let hi = self.breaks.get(bucket).copied();
        (lo, hi)
    }
}

/// Linear mapping of a numeric domain onto a pixel range, rounded to whole pixels.
#[derive(Debug, Clone, Copy)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn scale_round(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let t = if d1 != d0 { (value - d0) / (d1 - d0) } else { 0.5 };
        (self.range.0 + t * (self.range.1 - self.range.0)).round()
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }
}
