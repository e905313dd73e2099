//! Frame/Time model
//!
//! Maps a song's sample data onto a fixed-rate frame axis. Everything here
//! is a pure computation over a [`FrameRate`]; no state is kept.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BeatstackError, Result};

/// Index of a frame on the timeline
pub type FrameNumber = u32;

/// Frame rate used when nothing else is configured
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Frames per second of the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct FrameRate(u32);

impl Default for FrameRate {
    fn default() -> Self {
        FrameRate(DEFAULT_FRAME_RATE)
    }
}

impl TryFrom<u32> for FrameRate {
    type Error = BeatstackError;

    fn try_from(fps: u32) -> Result<Self> {
        FrameRate::new(fps)
    }
}

impl From<FrameRate> for u32 {
    fn from(rate: FrameRate) -> u32 {
        rate.0
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fps", self.0)
    }
}

impl FrameRate {
    /// Create a frame rate, rejecting zero
    ///
    /// # Example
    /// ```
    /// use beatstack::engine::FrameRate;
    /// let rate = FrameRate::new(30).unwrap();
    /// assert_eq!(rate.fps(), 30);
    /// assert!(FrameRate::new(0).is_err());
    /// ```
    pub fn new(fps: u32) -> Result<Self> {
        if fps == 0 {
            return Err(BeatstackError::InvalidFrameRate { fps });
        }
        Ok(FrameRate(fps))
    }

    /// Frames per second
    pub fn fps(&self) -> u32 {
        self.0
    }

    /// Wall-clock time between two clock ticks (one frame)
    pub fn tick_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.0 as u64)
    }

    /// Number of frames covering `duration_secs`, rounded to the nearest frame
    pub fn frame_qty(&self, duration_secs: f64) -> FrameNumber {
        (duration_secs.max(0.0) * self.0 as f64).round() as FrameNumber
    }

    /// Frame that is playing `seconds` into the song (floor)
    ///
    /// A tiny tolerance keeps `frame_at(seconds_at(f)) == f` despite rounding.
    pub fn frame_at(&self, seconds: f64) -> FrameNumber {
        (seconds.max(0.0) * self.0 as f64 + 1e-9).floor() as FrameNumber
    }

    /// Start time of `frame` in seconds
    pub fn seconds_at(&self, frame: FrameNumber) -> f64 {
        frame as f64 / self.0 as f64
    }

    /// Start time of `frame` in whole milliseconds, as audio outputs expect
    pub fn millis_at(&self, frame: FrameNumber) -> u64 {
        (self.seconds_at(frame) * 1000.0).round() as u64
    }

    /// Audio samples spanned by one frame
    pub fn samples_per_frame(&self, sample_rate: u32) -> f64 {
        sample_rate as f64 / self.0 as f64
    }

    /// Fractional frame coordinate of every sample, for plotting a waveform
    /// against the frame axis
    pub fn frame_axis(&self, sample_count: usize, sample_rate: u32) -> Vec<f64> {
        let samples_per_frame = self.samples_per_frame(sample_rate);
        (0..sample_count)
            .map(|i| i as f64 / samples_per_frame)
            .collect()
    }
}

/// Duration in seconds of `sample_count` samples
pub fn duration_secs(sample_count: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    sample_count as f64 / sample_rate as f64
}

/// Text for the transport's time label
pub fn format_frame_label(frame: FrameNumber, frame_qty: FrameNumber) -> String {
    format!("Frame: {}/{}", frame, frame_qty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_rate_rejected() {
        assert!(matches!(
            FrameRate::new(0),
            Err(BeatstackError::InvalidFrameRate { fps: 0 })
        ));
    }

    #[test]
    fn test_frame_qty_rounds() {
        let rate = FrameRate::default();
        assert_eq!(rate.frame_qty(80.0), 2400);
        assert_eq!(rate.frame_qty(1.01), 30);
        assert_eq!(rate.frame_qty(1.02), 31);
    }

    #[test]
    fn test_frame_at_floors() {
        let rate = FrameRate::default();
        assert_eq!(rate.frame_at(0.0), 0);
        assert_eq!(rate.frame_at(0.999), 29);
        assert_eq!(rate.frame_at(1.0), 30);
        assert_eq!(rate.frame_at(-3.0), 0);
        for frame in 0..500 {
            assert_eq!(rate.frame_at(rate.seconds_at(frame)), frame);
        }
    }

    #[test]
    fn test_tick_interval() {
        let rate = FrameRate::new(25).unwrap();
        assert_eq!(rate.tick_interval(), Duration::from_millis(40));
    }

    #[test]
    fn test_millis_at() {
        let rate = FrameRate::default();
        assert_eq!(rate.millis_at(0), 0);
        assert_eq!(rate.millis_at(45), 1500);
    }

    #[test]
    fn test_frame_axis() {
        let rate = FrameRate::default();
        let axis = rate.frame_axis(4, 60);
        assert_eq!(axis.len(), 4);
        assert_relative_eq!(axis[1], 0.5);
        assert_relative_eq!(axis[3], 1.5);
    }

    #[test]
    fn test_duration_secs() {
        assert_relative_eq!(duration_secs(96000, 48000), 2.0);
        assert_eq!(duration_secs(10, 0), 0.0);
    }

    #[test]
    fn test_frame_label() {
        assert_eq!(format_frame_label(12, 2400), "Frame: 12/2400");
    }

    #[test]
    fn test_serde_rejects_zero() {
        let parsed: std::result::Result<FrameRate, _> = serde_json::from_str("0");
        assert!(parsed.is_err());
        let parsed: FrameRate = serde_json::from_str("24").unwrap();
        assert_eq!(parsed.fps(), 24);
    }
}
