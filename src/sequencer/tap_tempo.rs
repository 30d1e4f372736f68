// Tap tempo - Median of recent tap intervals

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::timeline::Tempo;

/// Taps kept in the history
pub const MAX_TAPS: usize = 6;

/// Shortest interval accepted; anything faster is a double trigger
pub const MIN_INTERVAL: Duration = Duration::from_millis(120);

/// Longest interval accepted; anything slower is a stale tap
pub const MAX_INTERVAL: Duration = Duration::from_secs(2);

/// Estimates tempo from the last few taps
///
/// Intervals outside (0.12s, 2.0s) are ignored. Old taps fall off the end of
/// the history, so the estimate follows the player without an explicit reset.
#[derive(Debug, Clone, Default)]
pub struct TapTempo {
    taps: VecDeque<Instant>,
}

impl TapTempo {
    pub fn new() -> Self {
        Self {
            taps: VecDeque::with_capacity(MAX_TAPS),
        }
    }

    /// Record a tap and return the new estimate, if any interval is usable
    pub fn record_tap(&mut self, now: Instant) -> Option<Tempo> {
        if self.taps.len() == MAX_TAPS {
            self.taps.pop_front();
        }
        self.taps.push_back(now);
        self.estimate()
    }

    /// Current estimate from the stored taps
    pub fn estimate(&self) -> Option<Tempo> {
        let mut intervals: Vec<f64> = self
            .taps
            .iter()
            .zip(self.taps.iter().skip(1))
            .map(|(earlier, later)| later.saturating_duration_since(*earlier))
            .filter(|interval| *interval > MIN_INTERVAL && *interval < MAX_INTERVAL)
            .map(|interval| interval.as_secs_f64())
            .collect();

        median(&mut intervals).map(Tempo::from_beat_interval)
    }

    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    pub fn clear(&mut self) {
        self.taps.clear();
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
