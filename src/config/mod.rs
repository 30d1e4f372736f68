// Configuration - Scheduler tuning and persisted user settings

pub mod settings;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::audio::click::CLICK_DURATION_SECS;

pub use settings::{MetronomeSettings, SettingsError, SettingsStore};

/// Timing parameters of the beat scheduler
///
/// The lookahead must exceed the worst-case lateness of a tick plus dispatch
/// overhead, otherwise clicks reach the sink after their host time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How far ahead of now beats are handed to the sinks
    pub lookahead_secs: f64,
    /// Period of the polling tick
    pub tick_interval_ms: u64,
    /// Gap between `start()` and the first beat
    pub start_delay_secs: f64,
    /// Gap between a resync and the re-anchored downbeat
    pub resync_delay_secs: f64,
    /// Safety cap on beats dispatched by a single tick
    pub max_beats_per_tick: u32,
    /// How late a beat may be and still be dispatched; the mixer starts a
    /// click that is late by less than its own length
    pub late_tolerance_secs: f64,
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lookahead_secs: 0.25,
            tick_interval_ms: 20,
            start_delay_secs: 0.1,
            resync_delay_secs: 0.12,
            max_beats_per_tick: 16,
            late_tolerance_secs: CLICK_DURATION_SECS as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.lookahead_secs, 0.25);
        assert_eq!(config.tick_interval(), Duration::from_millis(20));
        assert_eq!(config.start_delay_secs, 0.1);
        assert_eq!(config.resync_delay_secs, 0.12);
        assert!((config.late_tolerance_secs - 0.06).abs() < 1e-9);
    }

    #[test]
    fn test_zero_tick_interval_is_raised() {
        let config = SchedulerConfig {
            tick_interval_ms: 0,
            ..SchedulerConfig::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_millis(1));
    }
}
