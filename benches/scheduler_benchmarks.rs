use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use metronome::audio::click::{ClickBank, ClickSound, make_click};
use metronome::audio::clock::{HostClock, HostTime, ManualClock};
use metronome::audio::mixer::{ClickMixer, ScheduledClick};
use metronome::config::SchedulerConfig;
use metronome::sequencer::{BeatEvent, BeatScheduler};
use std::sync::Arc;

/// Benchmark one scheduler tick (runs ~50 times a second)
fn bench_scheduler_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_tick");

    for bpm in [60.0, 120.0, 300.0] {
        let clock = ManualClock::new();
        let mut scheduler = BeatScheduler::new(Arc::new(clock.clone()), SchedulerConfig::default());
        scheduler.set_tempo(bpm);
        scheduler.start();
        let mut events: Vec<BeatEvent> = Vec::with_capacity(16);

        group.bench_with_input(BenchmarkId::from_parameter(bpm), &bpm, |b, _| {
            b.iter(|| {
                events.clear();
                clock.advance_seconds(0.02);
                black_box(scheduler.tick(&mut events));
            });
        });
    }
    group.finish();
}

/// Benchmark the mixer at typical device buffer sizes (audio callback path)
fn bench_mixer_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixer_render");
    let sample_rate = 48000.0;
    let clock = ManualClock::new();
    let bank = ClickBank::new(sample_rate);

    for buffer_size in [64, 256, 1024] {
        let mut mixer = ClickMixer::new(sample_rate, clock.timebase());
        let mut out = vec![0.0f32; buffer_size];
        let block = clock.to_host_delta(buffer_size as f64 / sample_rate as f64);
        let mut first_frame = HostTime::from_ticks(0);

        group.bench_with_input(
            BenchmarkId::from_parameter(buffer_size),
            &buffer_size,
            |b, _| {
                b.iter(|| {
                    // Keep one click sounding at all times
                    if mixer.active() == 0 {
                        mixer.enqueue(ScheduledClick {
                            buffer: bank.get(ClickSound::Wood, true),
                            at: first_frame,
                        });
                    }
                    mixer.render(first_frame, &mut out);
                    first_frame = first_frame.wrapping_add(block);
                    black_box(&out);
                });
            },
        );
    }
    group.finish();
}

/// Benchmark click synthesis (done once per sound at startup)
fn bench_make_click(c: &mut Criterion) {
    let mut group = c.benchmark_group("make_click");

    for sound in ClickSound::ALL {
        group.bench_with_input(
            BenchmarkId::from_parameter(sound.name()),
            &sound,
            |b, &sound| {
                b.iter(|| black_box(make_click(sound, true, 48000.0)));
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_scheduler_tick,
    bench_mixer_render,
    bench_make_click
);
criterion_main!(benches);
