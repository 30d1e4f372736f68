// Click synthesis - Short percussive buffers for the metronome
// Pure functions: the same (sound, accent, sample rate) always yields the same samples

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Length of every click buffer
pub const CLICK_DURATION_SECS: f32 = 0.06;

/// Attack time of the click envelope
const ATTACK_SECS: f32 = 0.002;

/// Shared, immutable click samples (mono)
pub type ClickBuffer = Arc<[f32]>;

/// Available click timbres
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ClickSound {
    /// Pure sine blip
    #[default]
    Beep,
    /// Resonant sine with a noise transient
    Wood,
    /// White noise burst
    Noise,
    /// Square wave blip
    Square,
}

impl ClickSound {
    pub const ALL: [ClickSound; 4] = [
        ClickSound::Beep,
        ClickSound::Wood,
        ClickSound::Noise,
        ClickSound::Square,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ClickSound::Beep => "beep",
            ClickSound::Wood => "wood",
            ClickSound::Noise => "noise",
            ClickSound::Square => "square",
        }
    }

    fn index(&self) -> usize {
        match self {
            ClickSound::Beep => 0,
            ClickSound::Wood => 1,
            ClickSound::Noise => 2,
            ClickSound::Square => 3,
        }
    }

    /// Tone frequency in Hz, `None` for pure noise
    fn frequency(&self, accent: bool) -> Option<f32> {
        match (self, accent) {
            (ClickSound::Beep, true) => Some(2000.0),
            (ClickSound::Beep, false) => Some(1600.0),
            (ClickSound::Wood, true) => Some(1200.0),
            (ClickSound::Wood, false) => Some(900.0),
            (ClickSound::Square, true) => Some(1000.0),
            (ClickSound::Square, false) => Some(800.0),
            (ClickSound::Noise, _) => None,
        }
    }
}

impl fmt::Display for ClickSound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ClickSound {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClickSound::ALL
            .into_iter()
            .find(|sound| sound.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown click sound '{}' (beep, wood, noise, square)", s))
    }
}

/// Synthesize one click
///
/// Accented clicks are louder and higher pitched. Every sample lies in [-1, 1].
pub fn make_click(sound: ClickSound, accent: bool, sample_rate: f32) -> Vec<f32> {
    let num_samples = (CLICK_DURATION_SECS as f64 * sample_rate as f64).round() as usize;
    let amplitude: f32 = if accent { 0.95 } else { 0.75 };
    let frequency = sound.frequency(accent).unwrap_or(0.0);

    // Seeded per (sound, accent) so noise is reproducible
    let seed = ((sound.index() as u64) << 1) | accent as u64;
    let mut rng = StdRng::seed_from_u64(0x6d65_7472_6f00 ^ seed);

    let mut samples = Vec::with_capacity(num_samples);
    for i in 0..num_samples {
        let t = i as f32 / sample_rate;
        let env = envelope(t, CLICK_DURATION_SECS);
        let tone = (2.0 * PI * frequency * t).sin();

        let raw = match sound {
            ClickSound::Beep => tone,
            ClickSound::Wood => 0.7 * tone + 0.3 * rng.gen_range(-1.0f32..=1.0),
            ClickSound::Noise => rng.gen_range(-1.0f32..=1.0),
            ClickSound::Square => {
                let square = if tone >= 0.0 { 1.0 } else { -1.0 };
                square * 0.6
            }
        };

        samples.push((amplitude * raw * env).clamp(-1.0, 1.0));
    }

    samples
}

/// Linear attack, then a steep polynomial decay to zero at `total`
fn envelope(t: f32, total: f32) -> f32 {
    if t < ATTACK_SECS {
        return t / ATTACK_SECS;
    }
    let decay = (total - ATTACK_SECS).max(1e-4);
    let x = (t - ATTACK_SECS) / decay;
    (1.0 - x).max(0.0).powi(4)
}

/// Every click the metronome can play, rendered once up front
#[derive(Debug, Clone)]
pub struct ClickBank {
    sample_rate: f32,
    // [sound][accent as usize]
    buffers: [[ClickBuffer; 2]; 4],
}

impl ClickBank {
    pub fn new(sample_rate: f32) -> Self {
        let render = |sound: ClickSound| -> [ClickBuffer; 2] {
            [
                make_click(sound, false, sample_rate).into(),
                make_click(sound, true, sample_rate).into(),
            ]
        };

        Self {
            sample_rate,
            buffers: ClickSound::ALL.map(render),
        }
    }

    /// Cheap handle to a prebuilt buffer
    pub fn get(&self, sound: ClickSound, accent: bool) -> ClickBuffer {
        Arc::clone(&self.buffers[sound.index()][accent as usize])
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Click length in frames
    pub fn click_len(&self) -> usize {
        self.buffers[0][0].len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(samples: &[f32]) -> f32 {
        samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }

    #[test]
    fn test_click_length() {
        // 60ms at 44.1kHz = 2646 samples
        let click = make_click(ClickSound::Beep, false, 44100.0);
        assert_eq!(click.len(), 2646);

        let click = make_click(ClickSound::Noise, true, 48000.0);
        assert_eq!(click.len(), 2880);
    }

    #[test]
    fn test_all_samples_clipped() {
        for sound in ClickSound::ALL {
            for accent in [false, true] {
                let click = make_click(sound, accent, 48000.0);
                assert!(click.iter().all(|s| s.is_finite() && (-1.0..=1.0).contains(s)));
            }
        }
    }

    #[test]
    fn test_accent_louder_than_regular() {
        for sound in ClickSound::ALL {
            let accent = make_click(sound, true, 48000.0);
            let regular = make_click(sound, false, 48000.0);
            assert!(
                peak(&accent) > peak(&regular),
                "{} accent should peak higher",
                sound
            );
        }
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        for sound in ClickSound::ALL {
            assert_eq!(
                make_click(sound, true, 44100.0),
                make_click(sound, true, 44100.0)
            );
        }
    }

    #[test]
    fn test_envelope_shape() {
        assert_eq!(envelope(0.0, CLICK_DURATION_SECS), 0.0);
        assert!((envelope(ATTACK_SECS, CLICK_DURATION_SECS) - 1.0).abs() < 1e-6);
        assert!(envelope(CLICK_DURATION_SECS, CLICK_DURATION_SECS) < 1e-12);
        assert!(envelope(0.03, CLICK_DURATION_SECS) < envelope(0.01, CLICK_DURATION_SECS));
    }

    #[test]
    fn test_bank_shares_buffers() {
        let bank = ClickBank::new(48000.0);
        let a = bank.get(ClickSound::Wood, true);
        let b = bank.get(ClickSound::Wood, true);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &bank.get(ClickSound::Wood, false)));
        assert_eq!(bank.click_len(), 2880);
    }

    #[test]
    fn test_sound_parsing() {
        assert_eq!("Wood".parse::<ClickSound>(), Ok(ClickSound::Wood));
        assert_eq!(" square ".parse::<ClickSound>(), Ok(ClickSound::Square));
        assert!("cowbell".parse::<ClickSound>().is_err());
    }
}
