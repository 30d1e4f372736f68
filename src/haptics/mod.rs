// Haptics - Optional tactile beat pulses
// Best effort: missing or failing hardware never reaches the scheduler

pub mod delay;
pub mod engine;

use crate::audio::clock::HostTime;
use thiserror::Error;

pub use engine::HapticEngine;

/// A single transient tap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HapticPulse {
    /// 0.0 - 1.0
    pub intensity: f32,
    /// 0.0 - 1.0
    pub sharpness: f32,
}

impl HapticPulse {
    pub const ACCENT: HapticPulse = HapticPulse {
        intensity: 1.0,
        sharpness: 0.9,
    };

    pub const REGULAR: HapticPulse = HapticPulse {
        intensity: 0.5,
        sharpness: 0.6,
    };

    pub fn for_beat(accent: bool) -> Self {
        if accent { Self::ACCENT } else { Self::REGULAR }
    }
}

#[derive(Debug, Error)]
pub enum HapticError {
    #[error("Haptics not supported by this hardware")]
    Unsupported,

    #[error("Haptic engine stopped: {0}")]
    EngineStopped(String),

    #[error("Haptic playback failed: {0}")]
    Playback(String),
}

/// Platform haptics hardware
pub trait HapticDevice: Send + 'static {
    /// Queried once, when the engine is prepared
    fn supports_haptics(&self) -> bool;

    /// Start (or restart) the underlying hardware engine
    fn start(&mut self) -> Result<(), HapticError>;

    /// Fire a transient immediately
    fn play_transient(&mut self, pulse: HapticPulse) -> Result<(), HapticError>;
}

/// Hardware without haptics (desktop machines)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHapticDevice;

impl HapticDevice for NoHapticDevice {
    fn supports_haptics(&self) -> bool {
        false
    }

    fn start(&mut self) -> Result<(), HapticError> {
        Err(HapticError::Unsupported)
    }

    fn play_transient(&mut self, _pulse: HapticPulse) -> Result<(), HapticError> {
        Err(HapticError::Unsupported)
    }
}

/// Accepts pulses for a future host time
/// Must not block and must never fail outward
pub trait HapticSink: Send {
    fn schedule_pulse(&mut self, pulse: HapticPulse, at: HostTime);
}

/// Discards every pulse
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHapticSink;

impl HapticSink for NullHapticSink {
    fn schedule_pulse(&mut self, _pulse: HapticPulse, _at: HostTime) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_for_beat() {
        assert_eq!(HapticPulse::for_beat(true), HapticPulse::ACCENT);
        assert_eq!(HapticPulse::for_beat(false).intensity, 0.5);
        assert_eq!(HapticPulse::for_beat(false).sharpness, 0.6);
    }

    #[test]
    fn test_no_haptic_device_reports_unsupported() {
        let mut device = NoHapticDevice;
        assert!(!device.supports_haptics());
        assert!(matches!(device.start(), Err(HapticError::Unsupported)));
    }
}
