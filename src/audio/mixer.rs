// Click mixer - Sample-accurate rendering of scheduled clicks
// Runs inside the audio callback: no allocation, no locks, no I/O

use super::click::ClickBuffer;
use super::clock::{HostTime, Timebase};

/// Upper bound on clicks waiting or sounding at once
/// At 300 BPM with a 250ms lookahead only 2-3 are ever in flight
pub const MAX_ACTIVE_CLICKS: usize = 32;

/// A click handed to the audio thread
#[derive(Debug, Clone)]
pub struct ScheduledClick {
    pub buffer: ClickBuffer,
    pub at: HostTime,
}

#[derive(Debug)]
struct Voice {
    buffer: ClickBuffer,
    at: HostTime,
    /// Read position once the click has started sounding
    position: Option<usize>,
}

/// Mixes clicks into output blocks at the frame matching their host time
#[derive(Debug)]
pub struct ClickMixer {
    voices: Vec<Voice>,
    sample_rate: f64,
    timebase: Timebase,
    dropped_late: u64,
    dropped_full: u64,
}

impl ClickMixer {
    pub fn new(sample_rate: f32, timebase: Timebase) -> Self {
        Self {
            voices: Vec::with_capacity(MAX_ACTIVE_CLICKS),
            sample_rate: sample_rate as f64,
            timebase,
            dropped_late: 0,
            dropped_full: 0,
        }
    }

    /// Queue a click; returns false (and counts a drop) when all slots are busy
    pub fn enqueue(&mut self, click: ScheduledClick) -> bool {
        if self.voices.len() >= MAX_ACTIVE_CLICKS {
            self.dropped_full += 1;
            return false;
        }
        self.voices.push(Voice {
            buffer: click.buffer,
            at: click.at,
            position: None,
        });
        true
    }

    /// Render one mono block whose first frame is heard at `first_frame`
    ///
    /// A click starts exactly at the frame matching its host time. Clicks that
    /// cross the end of the block continue at frame 0 of the next one. A click
    /// that arrives late by less than its own length starts immediately; later
    /// than that it is dropped.
    pub fn render(&mut self, first_frame: HostTime, out: &mut [f32]) {
        out.fill(0.0);

        let frames = out.len();
        let sample_rate = self.sample_rate;
        let timebase = self.timebase;
        let mut late = 0u64;

        self.voices.retain_mut(|voice| {
            let (start_frame, position) = match voice.position {
                Some(position) => (0, position),
                None => {
                    let seconds = timebase.seconds_between(first_frame, voice.at);
                    let offset = (seconds * sample_rate).round() as i64;
                    if offset >= frames as i64 {
                        // Not due in this block
                        return true;
                    }
                    if offset < 0 {
                        if offset.unsigned_abs() as usize >= voice.buffer.len() {
                            late += 1;
                            return false;
                        }
                        (0, 0)
                    } else {
                        (offset as usize, 0)
                    }
                }
            };

            let remaining = &voice.buffer[position..];
            let count = remaining.len().min(frames - start_frame);
            for (sample, click) in out[start_frame..start_frame + count]
                .iter_mut()
                .zip(remaining)
            {
                *sample += *click;
            }

            let next = position + count;
            voice.position = Some(next);
            next < voice.buffer.len()
        });

        self.dropped_late += late;

        // Overlapping clicks at very high tempo can sum past full scale
        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }

    /// Clicks waiting or sounding
    pub fn active(&self) -> usize {
        self.voices.len()
    }

    pub fn dropped_late(&self) -> u64 {
        self.dropped_late
    }

    pub fn dropped_full(&self) -> u64 {
        self.dropped_full
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate as f32
    }
}
