//! Timing configuration for the pulse decoder
//!
//! The default windows come from measurements of a WA-200 on a 24 V AC
//! signalling line after rectification and squaring. A single pulse repeats
//! roughly every 78 ms and the letter→number transition takes roughly 268 ms.

use std::time::Duration;

use thiserror::Error;

/// Inclusive interval of inter-edge durations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseWindow {
    pub min: Duration,
    pub max: Duration,
}

impl PulseWindow {
    /// Window spanning `min_ms..=max_ms`
    pub const fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min: Duration::from_millis(min_ms),
            max: Duration::from_millis(max_ms),
        }
    }

    /// Check whether an interval falls inside the window (both ends inclusive)
    #[inline]
    pub fn contains(&self, delta: Duration) -> bool {
        delta >= self.min && delta <= self.max
    }

    fn overlaps(&self, other: &PulseWindow) -> bool {
        self.min <= other.max && other.min <= self.max
    }
}

/// Errors reported by [`DecoderConfig::validate`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecoderConfigError {
    #[error("{0} window has min greater than max")]
    InvertedWindow(&'static str),

    #[error("short and gap windows overlap")]
    OverlappingWindows,

    #[error("end quiet period must be longer than the gap window")]
    EndNotAfterGap,

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Configuration for the wallbox pulse decoder
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Interval between two pulses of the same burst
    /// Default: 70..=85 ms
    pub short_window: PulseWindow,

    /// Interval marking the transition from the letter burst to the number burst
    /// Default: 260..=275 ms
    pub gap_window: PulseWindow,

    /// Quiet period after the last accepted edge that terminates a train
    /// Default: 350 ms
    pub end_quiet: Duration,

    /// How often the END watcher checks for a quiet line
    /// Default: 50 ms
    pub poll_interval: Duration,

    /// Edges closer than this to the previous accepted edge are contact bounce
    /// Default: 20 ms
    pub debounce: Duration,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            short_window: PulseWindow::from_millis(70, 85),
            gap_window: PulseWindow::from_millis(260, 275),
            end_quiet: Duration::from_millis(350),
            poll_interval: Duration::from_millis(50),
            debounce: Duration::from_millis(20),
        }
    }
}

impl DecoderConfig {
    /// Create a new DecoderConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration and return the first issue found
    pub fn validate(&self) -> Result<(), DecoderConfigError> {
        if self.short_window.min > self.short_window.max {
            return Err(DecoderConfigError::InvertedWindow("short"));
        }

        if self.gap_window.min > self.gap_window.max {
            return Err(DecoderConfigError::InvertedWindow("gap"));
        }

        if self.short_window.overlaps(&self.gap_window) {
            return Err(DecoderConfigError::OverlappingWindows);
        }

        if self.end_quiet <= self.gap_window.max || self.end_quiet <= self.short_window.max {
            return Err(DecoderConfigError::EndNotAfterGap);
        }

        if self.poll_interval.is_zero() {
            return Err(DecoderConfigError::ZeroDuration("poll interval"));
        }

        if self.debounce.is_zero() {
            return Err(DecoderConfigError::ZeroDuration("debounce"));
        }

        Ok(())
    }

    pub fn with_short_window(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.short_window = PulseWindow::from_millis(min_ms, max_ms);
        self
    }

    pub fn with_gap_window(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.gap_window = PulseWindow::from_millis(min_ms, max_ms);
        self
    }

    pub fn with_end_quiet(mut self, quiet: Duration) -> Self {
        self.end_quiet = quiet;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}
