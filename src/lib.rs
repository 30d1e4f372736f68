// Metronome - Library exports for the binary, tests and benchmarks

pub mod audio;
pub mod config;
pub mod haptics;
pub mod messaging;
pub mod sequencer;
pub mod ui;

// Re-export commonly used types for convenience
pub use audio::click::{ClickBank, ClickSound, make_click};
pub use audio::clock::{HostClock, HostDelta, HostTime, ManualClock, MonotonicClock, Timebase};
pub use audio::engine::{AudioOutput, CpalClickSink};
pub use audio::sink::{AudioSink, NullAudioSink};
pub use config::{MetronomeSettings, SchedulerConfig, SettingsStore};
pub use haptics::{HapticEngine, HapticPulse, HapticSink, NullHapticSink};
pub use messaging::channels::{create_beat_channel, create_notification_channel};
pub use sequencer::{
    BeatEvent, BeatScheduler, Meter, Metronome, ScheduleCursor, TapTempo, Tempo, TickSummary,
    TransportState,
};
pub use ui::PulseMonitor;
