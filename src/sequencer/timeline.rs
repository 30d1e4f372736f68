// Timeline - Tempo and meter
// Out-of-range input is clamped, never rejected

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tempo in BPM (Beats Per Minute), always within [20, 300]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    pub const MIN_BPM: f64 = 20.0;
    pub const MAX_BPM: f64 = 300.0;

    /// Creates a tempo, clamping into range
    /// NaN falls back to the default tempo
    pub fn new(bpm: f64) -> Self {
        if bpm.is_nan() {
            return Self::default();
        }
        Self {
            bpm: bpm.clamp(Self::MIN_BPM, Self::MAX_BPM),
        }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one beat in seconds
    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Tempo whose beat lasts `seconds`
    pub fn from_beat_interval(seconds: f64) -> Self {
        Self::new(60.0 / seconds)
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: 120.0 }
    }
}

impl From<f64> for Tempo {
    fn from(bpm: f64) -> Self {
        Self::new(bpm)
    }
}

impl From<Tempo> for f64 {
    fn from(tempo: Tempo) -> Self {
        tempo.bpm
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

/// Beats per bar, always within [1, 12]
/// Beat 0 of every bar is the accent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Meter {
    beats_per_bar: u32,
}

impl Meter {
    pub const MIN_BEATS: u32 = 1;
    pub const MAX_BEATS: u32 = 12;

    pub fn new(beats_per_bar: u32) -> Self {
        Self {
            beats_per_bar: beats_per_bar.clamp(Self::MIN_BEATS, Self::MAX_BEATS),
        }
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    /// Whether the beat at `beat_index` leads a bar
    pub fn is_accent(&self, beat_index: u64) -> bool {
        beat_index % self.beats_per_bar as u64 == 0
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self { beats_per_bar: 4 }
    }
}

impl From<u32> for Meter {
    fn from(beats_per_bar: u32) -> Self {
        Self::new(beats_per_bar)
    }
}

impl From<Meter> for u32 {
    fn from(meter: Meter) -> Self {
        meter.beats_per_bar
    }
}

impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/4", self.beats_per_bar)
    }
}
