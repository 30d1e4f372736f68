// Audio sink - Where scheduled clicks go

use super::click::ClickBuffer;
use super::clock::HostTime;

/// Accepts prebuilt click buffers for playback at a future host time
///
/// Implementations must not block: the beat scheduler calls this while
/// holding its lock. A sink that cannot render simply drops the click.
pub trait AudioSink: Send {
    /// Rate the click buffers must be rendered at
    fn sample_rate(&self) -> f32;

    /// Play `buffer` so that its first frame is heard at `at`
    fn schedule_click(&mut self, buffer: ClickBuffer, at: HostTime);
}

/// Sink used when no audio device could be opened
#[derive(Debug, Clone, Copy)]
pub struct NullAudioSink {
    sample_rate: f32,
}

impl NullAudioSink {
    pub fn new(sample_rate: f32) -> Self {
        Self { sample_rate }
    }
}

impl Default for NullAudioSink {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl AudioSink for NullAudioSink {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn schedule_click(&mut self, _buffer: ClickBuffer, _at: HostTime) {}
}
