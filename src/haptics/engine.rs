// Haptic engine - Delivers pulses on the device at their host time
//
// Capability is checked once. Without hardware every request is a no-op.
// A failed pulse triggers one silent restart of the device; the pulse itself
// is dropped. Nothing here is ever reported to the beat scheduler.

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Instant;

use super::delay::DelayQueue;
use super::{HapticDevice, HapticPulse, HapticSink};
use crate::audio::clock::{HostClock, HostTime};
use crate::audio::status::{AtomicSinkStatus, SinkStatus};

pub struct HapticEngine {
    clock: Arc<dyn HostClock>,
    queue: Option<DelayQueue<HapticPulse>>,
    status: AtomicSinkStatus,
}

impl HapticEngine {
    /// Probe `device` and start its delivery thread if it has haptics
    pub fn prepare<D: HapticDevice>(mut device: D, clock: Arc<dyn HostClock>) -> Self {
        if !device.supports_haptics() {
            info!("No haptics hardware, pulses disabled");
            return Self::unavailable(clock);
        }

        let status = AtomicSinkStatus::new(SinkStatus::Starting);
        match device.start() {
            Ok(()) => status.set(SinkStatus::Ready),
            Err(err) => {
                // Delivery will retry the start on the first failed pulse
                warn!("Haptics init error: {}", err);
                status.set(SinkStatus::Faulted);
            }
        }

        let worker_status = status.clone();
        match DelayQueue::spawn("haptics", move |pulse| {
            deliver(&mut device, pulse, &worker_status)
        }) {
            Ok(queue) => Self {
                clock,
                queue: Some(queue),
                status,
            },
            Err(err) => {
                error!("Failed to start haptics thread: {}", err);
                Self::unavailable(clock)
            }
        }
    }

    /// An engine that ignores every pulse
    pub fn unavailable(clock: Arc<dyn HostClock>) -> Self {
        Self {
            clock,
            queue: None,
            status: AtomicSinkStatus::new(SinkStatus::Unavailable),
        }
    }

    pub fn is_available(&self) -> bool {
        self.queue.is_some()
    }

    pub fn status(&self) -> SinkStatus {
        self.status.get()
    }
}

impl HapticSink for HapticEngine {
    fn schedule_pulse(&mut self, pulse: HapticPulse, at: HostTime) {
        let Some(queue) = &self.queue else {
            return;
        };

        let deadline = Instant::now() + self.clock.delay_until(at);
        if !queue.schedule(deadline, pulse) {
            debug!("Haptics thread has exited, pulse dropped");
        }
    }
}

fn deliver<D: HapticDevice>(device: &mut D, pulse: HapticPulse, status: &AtomicSinkStatus) {
    match device.play_transient(pulse) {
        Ok(()) => status.set(SinkStatus::Ready),
        Err(err) => {
            // Typically the hardware engine was stopped behind our back
            debug!("Haptic pulse failed: {}, restarting engine", err);
            match device.start() {
                Ok(()) => status.set(SinkStatus::Ready),
                Err(err) => {
                    debug!("Haptics restart failed: {}", err);
                    status.set(SinkStatus::Faulted);
                }
            }
        }
    }
}
