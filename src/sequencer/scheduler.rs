// Beat scheduler - Turns tempo and meter into timestamped beat events
//
// A coarse periodic tick (about 50 Hz) fills a lookahead window with every
// beat falling due in it. Each event carries its exact host time, so sinks
// render it precisely even when the tick itself ran a few milliseconds late,
// as long as it ran before the beat.
//
// The cursor advances by an integer host delta computed once per tick from
// that tick's tempo snapshot. No float is accumulated across beats.

use log::{debug, warn};
use std::sync::Arc;

use super::timeline::{Meter, Tempo};
use super::transport::TransportState;
use crate::audio::clock::{HostClock, HostDelta, HostTime};
use crate::config::SchedulerConfig;

/// Pointer into the infinite beat sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduleCursor {
    /// Host time of the next beat to dispatch
    pub next_beat: HostTime,
    /// Beats since the last start or resync; only its value modulo the
    /// meter matters
    pub beat_index: u64,
}

/// One beat, ready for dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeatEvent {
    pub at: HostTime,
    pub beat_index: u64,
    pub accent: bool,
}

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickSummary {
    /// Beats emitted
    pub dispatched: usize,
    /// Beats already in the past when the tick ran, dropped
    pub skipped: u64,
    /// The per-tick beat cap was hit; the rest follows next tick
    pub capped: bool,
}

/// Tempo, meter, transport and the schedule cursor of one metronome
pub struct BeatScheduler {
    clock: Arc<dyn HostClock>,
    config: SchedulerConfig,
    state: TransportState,
    cursor: ScheduleCursor,
    tempo: Tempo,
    meter: Meter,
}

impl BeatScheduler {
    pub fn new(clock: Arc<dyn HostClock>, config: SchedulerConfig) -> Self {
        Self {
            clock,
            config,
            state: TransportState::Stopped,
            cursor: ScheduleCursor::default(),
            tempo: Tempo::default(),
            meter: Meter::default(),
        }
    }

    /// Stopped -> Running; the first (accented) beat lands after the start delay
    /// Returns false if already running
    pub fn start(&mut self) -> bool {
        let Some(state) = self.state.start() else {
            return false;
        };
        self.state = state;
        self.anchor(self.config.start_delay_secs);
        debug!("Scheduler started, first beat at {:?}", self.cursor.next_beat);
        true
    }

    /// Running -> Stopped; the cursor is left as is
    /// Returns false if already stopped
    pub fn stop(&mut self) -> bool {
        let Some(state) = self.state.stop() else {
            return false;
        };
        self.state = state;
        debug!("Scheduler stopped at beat {}", self.cursor.beat_index);
        true
    }

    /// Re-anchor the beat grid so the next beat is a downbeat shortly from now
    ///
    /// Beats already dispatched stay dispatched. No-op while stopped.
    pub fn resync_phase(&mut self) -> bool {
        if !self.state.is_running() {
            return false;
        }
        self.anchor(self.config.resync_delay_secs);
        true
    }

    /// Set the tempo (clamped); resyncs if running and the value changed
    /// Returns whether the effective tempo changed
    pub fn set_tempo(&mut self, bpm: f64) -> bool {
        let tempo = Tempo::new(bpm);
        if tempo == self.tempo {
            return false;
        }
        self.tempo = tempo;
        self.resync_phase();
        true
    }

    /// Set the meter (clamped); resyncs if running and the value changed
    /// Returns whether the effective meter changed
    pub fn set_meter(&mut self, beats_per_bar: u32) -> bool {
        let meter = Meter::new(beats_per_bar);
        if meter == self.meter {
            return false;
        }
        self.meter = meter;
        self.resync_phase();
        true
    }

    /// Emit every beat due within the lookahead window into `out`
    ///
    /// Tempo and meter are read once, at the start of the tick.
    pub fn tick(&mut self, out: &mut Vec<BeatEvent>) -> TickSummary {
        let mut summary = TickSummary::default();
        if !self.state.is_running() {
            return summary;
        }

        let now = self.clock.now();
        let timebase = self.clock.timebase();
        let period = timebase
            .to_host_delta(self.tempo.seconds_per_beat())
            .max(HostDelta::from_ticks(1));
        let meter = self.meter;
        let horizon = now.wrapping_add(timebase.to_host_delta(self.config.lookahead_secs));

        // Slightly late beats still go out; the sink starts them immediately
        let tolerance = timebase.to_host_delta(self.config.late_tolerance_secs);
        if now.saturating_since(self.cursor.next_beat) > tolerance {
            summary.skipped = self.skip_late_beats(now, tolerance, period);
        }

        let max_beats = self.config.max_beats_per_tick.max(1) as usize;
        while self.cursor.next_beat.is_before(horizon) {
            if summary.dispatched >= max_beats {
                summary.capped = true;
                warn!(
                    "Beat cap of {} reached in one tick, deferring the rest",
                    max_beats
                );
                break;
            }

            let beat_index = self.cursor.beat_index;
            out.push(BeatEvent {
                at: self.cursor.next_beat,
                beat_index,
                accent: meter.is_accent(beat_index),
            });

            self.cursor.next_beat = self.cursor.next_beat.wrapping_add(period);
            self.cursor.beat_index = beat_index.wrapping_add(1);
            summary.dispatched += 1;
        }

        summary
    }

    /// Jump over beats later than `tolerance`, keeping the bar phase
    fn skip_late_beats(&mut self, now: HostTime, tolerance: HostDelta, period: HostDelta) -> u64 {
        let behind = now.saturating_since(self.cursor.next_beat);
        let missed = (behind.ticks() - tolerance.ticks()).div_ceil(period.ticks());

        match period.checked_mul(missed) {
            Some(skip) => {
                self.cursor.next_beat = self.cursor.next_beat.wrapping_add(skip);
                self.cursor.beat_index = self.cursor.beat_index.wrapping_add(missed);
            }
            None => self.cursor.next_beat = now,
        }

        warn!(
            "Scheduler fell {:.1} ms behind, skipped {} beats",
            self.clock.to_seconds(behind) * 1000.0,
            missed
        );
        missed
    }

    fn anchor(&mut self, delay_secs: f64) {
        let now = self.clock.now();
        self.cursor = ScheduleCursor {
            next_beat: self.clock.add_seconds(now, delay_secs),
            beat_index: 0,
        };
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn cursor(&self) -> ScheduleCursor {
        self.cursor
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn meter(&self) -> Meter {
        self.meter
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::clock::ManualClock;

    fn scheduler() -> (ManualClock, BeatScheduler) {
        let clock = ManualClock::new();
        clock.advance_seconds(10.0);
        let scheduler = BeatScheduler::new(Arc::new(clock.clone()), SchedulerConfig::default());
        (clock, scheduler)
    }

    #[test]
    fn test_start_anchors_first_beat() {
        let (clock, mut scheduler) = scheduler();
        assert!(scheduler.start());
        assert!(scheduler.is_running());

        let cursor = scheduler.cursor();
        assert_eq!(cursor.beat_index, 0);
        assert_eq!(cursor.next_beat, clock.add_seconds(clock.now(), 0.1));

        // Start while running is a no-op
        clock.advance_seconds(1.0);
        assert!(!scheduler.start());
        assert_eq!(scheduler.cursor(), cursor);
    }

    #[test]
    fn test_stop_keeps_cursor() {
        let (_clock, mut scheduler) = scheduler();
        assert!(!scheduler.stop());
        scheduler.start();
        let mut events = Vec::new();
        scheduler.tick(&mut events);
        let cursor = scheduler.cursor();

        assert!(scheduler.stop());
        assert_eq!(scheduler.cursor(), cursor);
        assert_eq!(scheduler.state(), TransportState::Stopped);
    }

    #[test]
    fn test_tick_while_stopped_is_noop() {
        let (_clock, mut scheduler) = scheduler();
        let mut events = Vec::new();
        assert_eq!(scheduler.tick(&mut events), TickSummary::default());
        assert!(events.is_empty());
    }

    #[test]
    fn test_first_tick_emits_accented_downbeat() {
        let (clock, mut scheduler) = scheduler();
        scheduler.start();

        let mut events = Vec::new();
        let summary = scheduler.tick(&mut events);

        // 120 BPM: beat at +0.1s is inside the 0.25s window, +0.6s is not
        assert_eq!(summary.dispatched, 1);
        assert_eq!(events[0].beat_index, 0);
        assert!(events[0].accent);
        assert_eq!(events[0].at, clock.add_seconds(clock.now(), 0.1));
        assert_eq!(scheduler.cursor().beat_index, 1);
    }

    #[test]
    fn test_resync_ignored_while_stopped() {
        let (_clock, mut scheduler) = scheduler();
        assert!(!scheduler.resync_phase());
        assert_eq!(scheduler.cursor(), ScheduleCursor::default());
    }

    #[test]
    fn test_resync_reanchors_downbeat() {
        let (clock, mut scheduler) = scheduler();
        scheduler.start();
        let mut events = Vec::new();
        for _ in 0..20 {
            clock.advance_seconds(0.02);
            scheduler.tick(&mut events);
        }
        assert!(scheduler.cursor().beat_index > 0);

        assert!(scheduler.resync_phase());
        let cursor = scheduler.cursor();
        assert_eq!(cursor.beat_index, 0);
        assert_eq!(cursor.next_beat, clock.add_seconds(clock.now(), 0.12));

        events.clear();
        scheduler.tick(&mut events);
        assert!(events[0].accent);
        assert_eq!(events[0].at, cursor.next_beat);
    }

    #[test]
    fn test_tempo_change_resyncs_only_when_changed() {
        let (clock, mut scheduler) = scheduler();
        scheduler.start();
        let mut events = Vec::new();
        clock.advance_seconds(0.3);
        scheduler.tick(&mut events);
        let cursor = scheduler.cursor();

        assert!(!scheduler.set_tempo(120.0));
        assert_eq!(scheduler.cursor(), cursor);

        assert!(scheduler.set_tempo(90.0));
        assert_eq!(scheduler.cursor().beat_index, 0);
        assert_eq!(
            scheduler.cursor().next_beat,
            clock.add_seconds(clock.now(), 0.12)
        );
    }

    #[test]
    fn test_setters_clamp() {
        let (_clock, mut scheduler) = scheduler();
        scheduler.set_tempo(400.0);
        assert_eq!(scheduler.tempo().bpm(), 300.0);
        scheduler.set_tempo(5.0);
        assert_eq!(scheduler.tempo().bpm(), 20.0);
        scheduler.set_meter(0);
        assert_eq!(scheduler.meter().beats_per_bar(), 1);
        scheduler.set_meter(99);
        assert_eq!(scheduler.meter().beats_per_bar(), 12);
    }

    #[test]
    fn test_meter_change_while_stopped_keeps_cursor() {
        let (_clock, mut scheduler) = scheduler();
        assert!(scheduler.set_meter(3));
        assert_eq!(scheduler.cursor(), ScheduleCursor::default());
    }

    #[test]
    fn test_late_beats_are_skipped_in_phase() {
        let (clock, mut scheduler) = scheduler();
        scheduler.set_meter(3);
        scheduler.start();
        let first = scheduler.cursor().next_beat;

        // Tick thread starved for 10 seconds
        clock.advance_seconds(10.0);
        let mut events = Vec::new();
        let summary = scheduler.tick(&mut events);

        assert!(summary.skipped > 0);
        assert!(summary.dispatched >= 1);
        for event in &events {
            assert!(event.at >= clock.now());
            // Still on the grid anchored at start, bar phase intact
            let offset = event.at.saturating_since(first).ticks();
            let period = clock.to_host_delta(0.5).ticks();
            assert_eq!(offset % period, 0);
            assert_eq!(offset / period, event.beat_index);
            assert_eq!(event.accent, event.beat_index % 3 == 0);
        }
    }

    #[test]
    fn test_slightly_late_downbeat_is_still_dispatched() {
        let (clock, mut scheduler) = scheduler();
        scheduler.start();
        let first = scheduler.cursor().next_beat;

        // The first tick runs 5 ms after the downbeat was due
        clock.advance_seconds(0.105);
        let mut events = Vec::new();
        let summary = scheduler.tick(&mut events);

        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.dispatched, 1);
        assert_eq!(events[0].beat_index, 0);
        assert!(events[0].accent);
        assert_eq!(events[0].at, first);
    }

    #[test]
    fn test_beat_past_tolerance_is_skipped() {
        let (clock, mut scheduler) = scheduler();
        scheduler.start();

        // Downbeat 300 ms late, well beyond the click length
        clock.advance_seconds(0.4);
        let mut events = Vec::new();
        let summary = scheduler.tick(&mut events);

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.dispatched, 1);
        assert_eq!(events[0].beat_index, 1);
        assert!(!events[0].accent);
        assert_eq!(events[0].at, clock.add_seconds(clock.now(), 0.2));
    }

    #[test]
    fn test_beat_cap_defers_remaining_beats() {
        let clock = ManualClock::new();
        let config = SchedulerConfig {
            lookahead_secs: 2.0,
            max_beats_per_tick: 3,
            ..SchedulerConfig::default()
        };
        let mut scheduler = BeatScheduler::new(Arc::new(clock.clone()), config);
        scheduler.set_tempo(300.0);
        scheduler.start();

        let mut events = Vec::new();
        let summary = scheduler.tick(&mut events);
        assert!(summary.capped);
        assert_eq!(summary.dispatched, 3);

        // The next tick picks up where the cap stopped
        let summary = scheduler.tick(&mut events);
        assert_eq!(events[3].beat_index, 3);
        assert!(summary.dispatched > 0);
    }
}
