// Metronome - Control surface and ticker thread
//
// The scheduler, tap history, sound toggles and sinks live in one struct
// behind one mutex. The ticker thread and every control call take that lock,
// so a tick and a resync never interleave. Dispatch into the sinks never
// blocks: audio and beat events go through ring buffers, haptics through the
// haptic engine's own delay thread.

use log::{debug, error, info};
use ringbuf::traits::Producer;
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::scheduler::{BeatEvent, BeatScheduler, ScheduleCursor, TickSummary};
use super::tap_tempo::TapTempo;
use super::timeline::{Meter, Tempo};
use crate::audio::clock::HostClock;
use crate::audio::click::{ClickBank, ClickSound};
use crate::audio::sink::AudioSink;
use crate::config::{MetronomeSettings, SchedulerConfig};
use crate::haptics::{HapticPulse, HapticSink};
use crate::messaging::channels::BeatProducer;

#[derive(Debug, thiserror::Error)]
pub enum MetronomeError {
    #[error("Failed to spawn ticker thread: {0}")]
    TickerSpawn(#[from] io::Error),
}

/// Which outputs a beat goes to, read once per tick
#[derive(Debug, Clone, Copy)]
struct Voicing {
    sound: ClickSound,
    sound_enabled: bool,
    haptics_enabled: bool,
}

/// Hands beat events to the sinks
struct Dispatcher {
    audio: Box<dyn AudioSink>,
    haptics: Box<dyn HapticSink>,
    clicks: ClickBank,
    beats: Option<BeatProducer>,
    events: Vec<BeatEvent>,
    dropped_beats: u64,
}

impl Dispatcher {
    fn flush(&mut self, voicing: Voicing) {
        for event in &self.events {
            if voicing.sound_enabled {
                let buffer = self.clicks.get(voicing.sound, event.accent);
                self.audio.schedule_click(buffer, event.at);
            }

            if voicing.haptics_enabled {
                self.haptics
                    .schedule_pulse(HapticPulse::for_beat(event.accent), event.at);
            }

            if let Some(beats) = self.beats.as_mut() {
                if beats.try_push(*event).is_err() {
                    self.dropped_beats += 1;
                    debug!("Beat channel full, pulse for beat {} dropped", event.beat_index);
                }
            }
        }
        self.events.clear();
    }
}

struct Shared {
    scheduler: BeatScheduler,
    taps: TapTempo,
    voicing: Voicing,
    dispatcher: Dispatcher,
}

impl Shared {
    fn tick(&mut self) -> TickSummary {
        let summary = self.scheduler.tick(&mut self.dispatcher.events);
        self.dispatcher.flush(self.voicing);
        summary
    }
}

struct Ticker {
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl Ticker {
    fn spawn(shared: Arc<Mutex<Shared>>, interval: Duration) -> io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("metronome-ticker".to_string())
            .spawn(move || {
                loop {
                    lock(&shared).tick();

                    // The timeout is the tick period; a message or hang-up stops us
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("Ticker thread exiting");
            })?;

        Ok(Self { stop_tx, handle })
    }

    fn shutdown(self) {
        let _ = self.stop_tx.send(());
        if self.handle.join().is_err() {
            error!("Ticker thread panicked");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A running-or-stopped metronome
///
/// Every method takes `&self` and may be called from any thread.
pub struct Metronome {
    shared: Arc<Mutex<Shared>>,
    ticker: Mutex<Option<Ticker>>,
    tick_interval: Duration,
}

impl Metronome {
    /// Create a stopped metronome
    ///
    /// Click buffers for every sound are rendered here, at the audio sink's
    /// sample rate. Scheduler timing is fixed for the metronome's lifetime.
    pub fn new(
        clock: Arc<dyn HostClock>,
        config: SchedulerConfig,
        audio: Box<dyn AudioSink>,
        haptics: Box<dyn HapticSink>,
    ) -> Self {
        let clicks = ClickBank::new(audio.sample_rate());
        let max_events = config.max_beats_per_tick.max(1) as usize;
        let tick_interval = config.tick_interval();

        let shared = Shared {
            scheduler: BeatScheduler::new(clock, config),
            taps: TapTempo::new(),
            voicing: Voicing {
                sound: ClickSound::default(),
                sound_enabled: true,
                haptics_enabled: false,
            },
            dispatcher: Dispatcher {
                audio,
                haptics,
                clicks,
                beats: None,
                events: Vec::with_capacity(max_events),
                dropped_beats: 0,
            },
        };

        Self {
            shared: Arc::new(Mutex::new(shared)),
            ticker: Mutex::new(None),
            tick_interval,
        }
    }

    /// Also publish every dispatched beat on `beats`, for presentation
    pub fn with_beat_output(self, beats: BeatProducer) -> Self {
        lock(&self.shared).dispatcher.beats = Some(beats);
        self
    }

    /// Start the transport and the ticker thread
    /// Returns `Ok(false)` if already running
    pub fn start(&self) -> Result<bool, MetronomeError> {
        let mut ticker = lock(&self.ticker);
        if !lock(&self.shared).scheduler.start() {
            return Ok(false);
        }

        if ticker.is_none() {
            match Ticker::spawn(Arc::clone(&self.shared), self.tick_interval) {
                Ok(spawned) => *ticker = Some(spawned),
                Err(err) => {
                    lock(&self.shared).scheduler.stop();
                    return Err(err.into());
                }
            }
        }

        info!("Metronome started at {}", self.tempo());
        Ok(true)
    }

    /// Stop scheduling new beats and join the ticker
    ///
    /// Clicks already handed to the sinks still play.
    pub fn stop(&self) -> bool {
        let mut ticker = lock(&self.ticker);
        let stopped = lock(&self.shared).scheduler.stop();
        if let Some(ticker) = ticker.take() {
            ticker.shutdown();
        }
        if stopped {
            info!("Metronome stopped");
        }
        stopped
    }

    /// Restart the bar: the next beat is a downbeat about 0.12s from now
    pub fn resync_phase(&self) -> bool {
        lock(&self.shared).scheduler.resync_phase()
    }

    /// Feed a tap; on a usable estimate the tempo is set and the bar resynced
    pub fn record_tap(&self, now: Instant) -> Option<Tempo> {
        let mut shared = lock(&self.shared);
        let estimate = shared.taps.record_tap(now)?;
        if !shared.scheduler.set_tempo(estimate.bpm()) {
            shared.scheduler.resync_phase();
        }
        let tempo = shared.scheduler.tempo();
        debug!("Tap tempo: {}", tempo);
        Some(tempo)
    }

    /// Set the tempo, clamped to [20, 300] BPM; returns the effective tempo
    pub fn set_tempo(&self, bpm: f64) -> Tempo {
        let mut shared = lock(&self.shared);
        shared.scheduler.set_tempo(bpm);
        shared.scheduler.tempo()
    }

    /// Shift the tempo by `delta` BPM
    pub fn nudge_tempo(&self, delta: f64) -> Tempo {
        let mut shared = lock(&self.shared);
        let bpm = shared.scheduler.tempo().bpm() + delta;
        shared.scheduler.set_tempo(bpm);
        shared.scheduler.tempo()
    }

    /// Set beats per bar, clamped to [1, 12]; returns the effective meter
    pub fn set_meter(&self, beats_per_bar: u32) -> Meter {
        let mut shared = lock(&self.shared);
        shared.scheduler.set_meter(beats_per_bar);
        shared.scheduler.meter()
    }

    pub fn set_sound(&self, sound: ClickSound) {
        lock(&self.shared).voicing.sound = sound;
    }

    pub fn set_sound_enabled(&self, enabled: bool) {
        lock(&self.shared).voicing.sound_enabled = enabled;
    }

    pub fn set_haptics_enabled(&self, enabled: bool) {
        lock(&self.shared).voicing.haptics_enabled = enabled;
    }

    pub fn tempo(&self) -> Tempo {
        lock(&self.shared).scheduler.tempo()
    }

    pub fn meter(&self) -> Meter {
        lock(&self.shared).scheduler.meter()
    }

    pub fn sound(&self) -> ClickSound {
        lock(&self.shared).voicing.sound
    }

    pub fn sound_enabled(&self) -> bool {
        lock(&self.shared).voicing.sound_enabled
    }

    pub fn haptics_enabled(&self) -> bool {
        lock(&self.shared).voicing.haptics_enabled
    }

    pub fn is_running(&self) -> bool {
        lock(&self.shared).scheduler.is_running()
    }

    pub fn cursor(&self) -> ScheduleCursor {
        lock(&self.shared).scheduler.cursor()
    }

    /// Beat events lost because the beat channel was full
    pub fn dropped_beats(&self) -> u64 {
        lock(&self.shared).dispatcher.dropped_beats
    }

    /// Run one scheduling pass right now
    ///
    /// The ticker thread calls this on its own; it is exposed for callers
    /// that drive time themselves.
    pub fn tick(&self) -> TickSummary {
        lock(&self.shared).tick()
    }

    /// Snapshot of the user-facing state
    pub fn settings(&self) -> MetronomeSettings {
        let shared = lock(&self.shared);
        MetronomeSettings {
            bpm: shared.scheduler.tempo(),
            beats_per_bar: shared.scheduler.meter(),
            sound: shared.voicing.sound,
            sound_enabled: shared.voicing.sound_enabled,
            haptics_enabled: shared.voicing.haptics_enabled,
            scheduler: *shared.scheduler.config(),
        }
    }

    /// Apply tempo, meter, sound and toggles from `settings`
    /// The `scheduler` section only takes effect at construction.
    pub fn apply_settings(&self, settings: &MetronomeSettings) {
        let mut shared = lock(&self.shared);
        shared.scheduler.set_tempo(settings.bpm.bpm());
        shared.scheduler.set_meter(settings.beats_per_bar.beats_per_bar());
        shared.voicing = Voicing {
            sound: settings.sound,
            sound_enabled: settings.sound_enabled,
            haptics_enabled: settings.haptics_enabled,
        };
    }
}

impl Drop for Metronome {
    fn drop(&mut self) {
        let ticker = self
            .ticker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(ticker) = ticker {
            ticker.shutdown();
        }
    }
}
