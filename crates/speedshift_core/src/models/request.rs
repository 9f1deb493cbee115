//! Request and result structures for a single transform job.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Playback-rate multiplier. Below 1.0 slows down, above 1.0 speeds up;
/// pitch moves with it.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SpeedFactor(f64);

impl SpeedFactor {
    /// Lower end of the range offered to users.
    pub const MIN: f64 = 0.1;
    /// Upper end of the range offered to users.
    pub const MAX: f64 = 5.0;
    /// No speed or pitch change.
    pub const IDENTITY: SpeedFactor = SpeedFactor(1.0);

    /// Create a speed factor. Returns `None` for non-finite or
    /// non-positive values, which cannot form a valid filter.
    ///
    /// The recommended range is not enforced here; see
    /// [`is_in_recommended_range`](Self::is_in_recommended_range).
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && value > 0.0).then_some(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_slowed(self) -> bool {
        self.0 < 1.0
    }

    pub fn is_sped_up(self) -> bool {
        self.0 > 1.0
    }

    pub fn is_identity(self) -> bool {
        self.0 == 1.0
    }

    /// Whether the factor lies within `MIN..=MAX`.
    pub fn is_in_recommended_range(self) -> bool {
        (Self::MIN..=Self::MAX).contains(&self.0)
    }

    /// Signed percentage change, e.g. 0.8 -> -20, 1.25 -> 25.
    pub fn percent_change(self) -> i64 {
        ((self.0 - 1.0) * 100.0).round() as i64
    }

    /// Sample rate the waveform is reinterpreted at.
    pub fn scaled_rate(self, current_rate: u32) -> u32 {
        (current_rate as f64 * self.0).round() as u32
    }
}

impl Default for SpeedFactor {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TryFrom<f64> for SpeedFactor {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("speed factor must be a positive number, got {}", value))
    }
}

impl From<SpeedFactor> for f64 {
    fn from(factor: SpeedFactor) -> Self {
        factor.0
    }
}

impl FromStr for SpeedFactor {
    type Err = String;

    /// Accepts `0.8` as well as `0,8`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace(',', ".");
        let value: f64 = normalized
            .parse()
            .map_err(|_| format!("not a number: '{}'", s.trim()))?;
        Self::try_from(value)
    }
}

impl std::fmt::Display for SpeedFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x", self.0)
    }
}

/// One transform job. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformRequest {
    input: PathBuf,
    speed: SpeedFactor,
    output: PathBuf,
    original_filename: Option<String>,
}

impl TransformRequest {
    /// Create a request without a filename hint.
    pub fn new(input: impl Into<PathBuf>, speed: SpeedFactor, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            speed,
            output: output.into(),
            original_filename: None,
        }
    }

    /// Name of the file as the user submitted it. Used as the title when
    /// the input carries no title tag.
    pub fn with_original_filename(mut self, name: impl Into<String>) -> Self {
        self.original_filename = Some(name.into());
        self
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn speed(&self) -> SpeedFactor {
        self.speed
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn original_filename(&self) -> Option<&str> {
        self.original_filename.as_deref()
    }
}

/// A successfully written output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOutput {
    pub path: PathBuf,
    /// Size in bytes (always non-zero).
    pub size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_and_non_finite() {
        assert!(SpeedFactor::new(0.0).is_none());
        assert!(SpeedFactor::new(-1.0).is_none());
        assert!(SpeedFactor::new(f64::NAN).is_none());
        assert!(SpeedFactor::new(f64::INFINITY).is_none());
        assert!(SpeedFactor::new(0.05).is_some());
    }

    #[test]
    fn scaled_rate_rounds() {
        let slow = SpeedFactor::new(0.8).unwrap();
        let fast = SpeedFactor::new(1.2).unwrap();
        assert_eq!(slow.scaled_rate(44100), 35280);
        assert_eq!(fast.scaled_rate(44100), 52920);
        assert_eq!(SpeedFactor::IDENTITY.scaled_rate(48000), 48000);
    }

    #[test]
    fn percent_change_is_signed_and_rounded() {
        assert_eq!(SpeedFactor::new(0.8).unwrap().percent_change(), -20);
        assert_eq!(SpeedFactor::new(1.2).unwrap().percent_change(), 20);
        assert_eq!(SpeedFactor::new(1.25).unwrap().percent_change(), 25);
        assert_eq!(SpeedFactor::new(0.333).unwrap().percent_change(), -67);
        assert_eq!(SpeedFactor::IDENTITY.percent_change(), 0);
    }

    #[test]
    fn parses_comma_decimal() {
        let factor: SpeedFactor = "0,75".parse().unwrap();
        assert_eq!(factor.value(), 0.75);
        assert!("abc".parse::<SpeedFactor>().is_err());
        assert!("-2".parse::<SpeedFactor>().is_err());
    }

    #[test]
    fn recommended_range_is_inclusive() {
        assert!(SpeedFactor::new(0.1).unwrap().is_in_recommended_range());
        assert!(SpeedFactor::new(5.0).unwrap().is_in_recommended_range());
        assert!(!SpeedFactor::new(6.0).unwrap().is_in_recommended_range());
    }

    #[test]
    fn request_keeps_hint() {
        let req = TransformRequest::new("in.mp3", SpeedFactor::IDENTITY, "out.mp3")
            .with_original_filename("My Song.mp3");
        assert_eq!(req.original_filename(), Some("My Song.mp3"));
        assert_eq!(req.output(), Path::new("out.mp3"));
    }
}
