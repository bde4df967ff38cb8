//! Timing configuration for gesture detection
//!
//! All windows are expressed in milliseconds so the struct maps directly onto
//! the `[timing]` table of the host config file. Fields missing from a file
//! fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::GestureError;

fn default_double_press_window() -> u64 {
    300
}
fn default_long_press_threshold() -> u64 {
    500
}
fn default_chord_window() -> u64 {
    50
}

/// Durations that drive the per-button detector and the chord coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Max gap between a release and the next press of the same button
    /// for the pair to count as a double press
    #[serde(default = "default_double_press_window")]
    pub double_press_window_ms: u64,
    /// Continuous hold after which a long press fires (while still held)
    #[serde(default = "default_long_press_threshold")]
    pub long_press_threshold_ms: u64,
    /// Max gap between overlapping presses still treated as one chord
    #[serde(default = "default_chord_window")]
    pub chord_window_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            double_press_window_ms: default_double_press_window(),
            long_press_threshold_ms: default_long_press_threshold(),
            chord_window_ms: default_chord_window(),
        }
    }
}

impl TimingConfig {
    pub fn new(
        double_press_window_ms: u64,
        long_press_threshold_ms: u64,
        chord_window_ms: u64,
    ) -> Self {
        Self {
            double_press_window_ms,
            long_press_threshold_ms,
            chord_window_ms,
        }
    }

    pub fn double_press_window(&self) -> Duration {
        Duration::from_millis(self.double_press_window_ms)
    }

    pub fn long_press_threshold(&self) -> Duration {
        Duration::from_millis(self.long_press_threshold_ms)
    }

    pub fn chord_window(&self) -> Duration {
        Duration::from_millis(self.chord_window_ms)
    }

    /// Longest time any gesture can stay undecided after the last event.
    pub fn settle_time(&self) -> Duration {
        let longest = self
            .double_press_window_ms
            .max(self.long_press_threshold_ms)
            .max(self.chord_window_ms);
        Duration::from_millis(longest + self.chord_window_ms)
    }

    /// Reject zero-length windows.
    ///
    /// The engine itself accepts whatever it is given; callers loading
    /// configuration from disk should check it here first.
    pub fn validate(&self) -> Result<(), GestureError> {
        let fields = [
            ("double_press_window_ms", self.double_press_window_ms),
            ("long_press_threshold_ms", self.long_press_threshold_ms),
            ("chord_window_ms", self.chord_window_ms),
        ];
        for (field, value) in fields {
            if value == 0 {
                return Err(GestureError::InvalidTiming { field, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let timing = TimingConfig::default();
        assert_eq!(timing.double_press_window(), Duration::from_millis(300));
        assert_eq!(timing.long_press_threshold(), Duration::from_millis(500));
        assert_eq!(timing.chord_window(), Duration::from_millis(50));
        assert!(timing.validate().is_ok());
    }

    #[test]
    fn test_partial_table_takes_defaults() {
        let timing: TimingConfig = toml::from_str("chord_window_ms = 80").unwrap();
        assert_eq!(timing.chord_window_ms, 80);
        assert_eq!(timing.double_press_window_ms, 300);
        assert_eq!(timing.long_press_threshold_ms, 500);
    }

    #[test]
    fn test_zero_rejected() {
        let timing = TimingConfig::new(300, 0, 50);
        assert_eq!(
            timing.validate(),
            Err(GestureError::InvalidTiming {
                field: "long_press_threshold_ms",
                value: 0
            })
        );
    }

    #[test]
    fn test_settle_time_covers_longest_window() {
        let timing = TimingConfig::new(300, 500, 50);
        assert_eq!(timing.settle_time(), Duration::from_millis(550));
    }
}
