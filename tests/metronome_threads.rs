// Integration test: Metronome with its real ticker thread
//
// Uses the monotonic clock, so assertions stick to properties that hold
// regardless of how the OS schedules the ticker.

use metronome::audio::click::ClickBuffer;
use metronome::audio::clock::{HostClock, HostTime, MonotonicClock};
use metronome::config::SchedulerConfig;
use metronome::haptics::{HapticEngine, NoHapticDevice};
use metronome::{
    AudioSink, Metronome, NullAudioSink, NullHapticSink, PulseMonitor, create_beat_channel,
};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Clone, Default)]
struct CaptureSink {
    clicks: Arc<Mutex<Vec<HostTime>>>,
}

impl AudioSink for CaptureSink {
    fn sample_rate(&self) -> f32 {
        44100.0
    }

    fn schedule_click(&mut self, _buffer: ClickBuffer, at: HostTime) {
        self.clicks.lock().unwrap().push(at);
    }
}

fn capture_metronome() -> (Arc<MonotonicClock>, CaptureSink, Metronome) {
    let clock = Arc::new(MonotonicClock::new());
    let sink = CaptureSink::default();
    let metronome = Metronome::new(
        clock.clone(),
        SchedulerConfig::default(),
        Box::new(sink.clone()),
        Box::new(NullHapticSink),
    );
    (clock, sink, metronome)
}

#[test]
fn test_ticker_schedules_clicks_ahead_of_time() {
    let (clock, sink, metronome) = capture_metronome();
    metronome.set_tempo(300.0);

    let started_at = clock.now();
    assert!(metronome.start().unwrap());
    thread::sleep(Duration::from_millis(1100));
    assert!(metronome.stop());

    let clicks = sink.clicks.lock().unwrap().clone();
    // 1.1s at 0.2s per beat plus the lookahead: at least five clicks
    assert!(clicks.len() >= 5, "only {} clicks", clicks.len());

    // First downbeat lands 0.1s after start
    let first_offset = clock.timebase().seconds_between(started_at, clicks[0]);
    assert!((0.1..0.15).contains(&first_offset), "offset {first_offset}");

    let period = clock.to_host_delta(0.2);
    for pair in clicks.windows(2) {
        assert_eq!(pair[1].saturating_since(pair[0]), period);
    }
}

#[test]
fn test_stop_halts_future_scheduling() {
    let (_clock, sink, metronome) = capture_metronome();
    metronome.set_tempo(300.0);
    metronome.start().unwrap();
    thread::sleep(Duration::from_millis(300));
    metronome.stop();

    let count = sink.clicks.lock().unwrap().len();
    thread::sleep(Duration::from_millis(500));
    assert_eq!(sink.clicks.lock().unwrap().len(), count);
    assert!(!metronome.is_running());
}

#[test]
fn test_restart_begins_a_new_bar() {
    let (clock, _sink, metronome) = capture_metronome();
    let (tx, rx) = create_beat_channel(64);
    let metronome = metronome.with_beat_output(tx);
    let mut monitor = PulseMonitor::new(rx, clock.clone());

    metronome.start().unwrap();
    thread::sleep(Duration::from_millis(50));
    metronome.stop();
    metronome.start().unwrap();
    thread::sleep(Duration::from_millis(50));
    metronome.stop();

    // Each start dispatched its own accented downbeat
    thread::sleep(Duration::from_millis(200));
    let mut fired = Vec::new();
    while let Some(beat) = monitor.poll() {
        fired.push(beat);
    }
    assert_eq!(fired.len(), 2);
    assert!(fired.iter().all(|beat| beat.beat_index == 0 && beat.accent));
}

#[test]
fn test_concurrent_control_keeps_schedule_sane() {
    let (clock, sink, metronome) = capture_metronome();
    let metronome = Arc::new(metronome);
    metronome.start().unwrap();

    let controllers: Vec<_> = (0..4)
        .map(|id| {
            let metronome = Arc::clone(&metronome);
            thread::spawn(move || {
                let origin = Instant::now();
                for i in 0..200u32 {
                    match i % 4 {
                        0 => {
                            metronome.set_tempo(60.0 + ((id * 200 + i) % 240) as f64);
                        }
                        1 => {
                            metronome.set_meter(1 + (i % 12));
                        }
                        2 => {
                            metronome.resync_phase();
                        }
                        _ => {
                            metronome.record_tap(origin + Duration::from_millis(u64::from(i) * 300));
                        }
                    }
                    thread::sleep(Duration::from_millis(1));
                }
            })
        })
        .collect();

    for controller in controllers {
        controller.join().unwrap();
    }
    metronome.stop();

    let tempo = metronome.tempo().bpm();
    assert!((20.0..=300.0).contains(&tempo));
    let meter = metronome.meter().beats_per_bar();
    assert!((1..=12).contains(&meter));

    // Nothing was scheduled further ahead than the lookahead window
    let horizon = clock.add_seconds(clock.now(), 0.25);
    assert!(sink.clicks.lock().unwrap().iter().all(|at| *at < horizon));
}

#[test]
fn test_no_crash_without_hardware() {
    let clock: Arc<dyn HostClock> = Arc::new(MonotonicClock::new());
    let haptics = HapticEngine::prepare(NoHapticDevice, Arc::clone(&clock));
    assert!(!haptics.is_available());

    let metronome = Metronome::new(
        clock,
        SchedulerConfig::default(),
        Box::new(NullAudioSink::default()),
        Box::new(haptics),
    );
    metronome.set_haptics_enabled(true);

    assert!(metronome.start().unwrap());
    let origin = Instant::now();
    metronome.record_tap(origin);
    metronome.record_tap(origin + Duration::from_millis(500));
    assert!(metronome.resync_phase());
    metronome.set_meter(3);
    thread::sleep(Duration::from_millis(300));
    assert!(metronome.stop());
    assert!(!metronome.resync_phase());
}

#[test]
fn test_drop_while_running_joins_ticker() {
    let (_clock, sink, metronome) = capture_metronome();
    metronome.start().unwrap();
    thread::sleep(Duration::from_millis(150));
    drop(metronome);

    let count = sink.clicks.lock().unwrap().len();
    thread::sleep(Duration::from_millis(600));
    assert_eq!(sink.clicks.lock().unwrap().len(), count);
}
