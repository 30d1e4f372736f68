// Pulse monitor - Visual beat indicator fed by the beat channel
//
// Beat events arrive up to a lookahead window early. The monitor holds each
// one until its host time and only then flips the pulse, so the indicator
// lines up with the click the listener hears.

use ringbuf::traits::Consumer;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::audio::clock::HostClock;
use crate::messaging::channels::BeatConsumer;
use crate::sequencer::BeatEvent;

pub struct PulseMonitor {
    beats: BeatConsumer,
    clock: Arc<dyn HostClock>,
    pending: VecDeque<BeatEvent>,
    pulse: bool,
    last: Option<BeatEvent>,
}

impl PulseMonitor {
    pub fn new(beats: BeatConsumer, clock: Arc<dyn HostClock>) -> Self {
        Self {
            beats,
            clock,
            pending: VecDeque::new(),
            pulse: false,
            last: None,
        }
    }

    /// Fire the oldest event whose time has come, flipping the pulse
    ///
    /// Call in a loop until it returns `None` to catch up on every due beat.
    pub fn poll(&mut self) -> Option<BeatEvent> {
        self.drain();

        let now = self.clock.now();
        let due = self.pending.front().is_some_and(|event| !now.is_before(event.at));
        if !due {
            return None;
        }

        let event = self.pending.pop_front()?;
        self.pulse = !self.pulse;
        self.last = Some(event);
        Some(event)
    }

    /// Time until the next held event is due, `None` if nothing is held
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.drain();
        self.pending
            .front()
            .map(|event| self.clock.delay_until(event.at))
    }

    /// Toggles once per fired beat
    pub fn pulse(&self) -> bool {
        self.pulse
    }

    /// Most recently fired beat
    pub fn last_beat(&self) -> Option<BeatEvent> {
        self.last
    }

    /// Events received but not yet due
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn drain(&mut self) {
        while let Some(event) = self.beats.try_pop() {
            self.pending.push_back(event);
        }
    }
}
