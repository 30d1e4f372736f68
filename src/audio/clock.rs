// Host clock - Monotonic hardware time domain
// All beat timestamps are integer ticks; seconds only appear at the boundary

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// A point in host time, in clock ticks since an arbitrary epoch
/// Only differences between host times are meaningful
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostTime(u64);

impl HostTime {
    pub const fn from_ticks(ticks: u64) -> Self {
        Self(ticks)
    }

    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Advance by a delta (wraps instead of panicking on overflow)
    pub const fn wrapping_add(self, delta: HostDelta) -> Self {
        Self(self.0.wrapping_add(delta.0))
    }

    /// Signed tick distance from `other` to `self`
    ///
    /// Computed on the wrapped difference, so it stays correct across the
    /// `u64` wrap as long as both times are within `i64::MAX` ticks.
    pub const fn offset_from(self, other: HostTime) -> i64 {
        self.0.wrapping_sub(other.0) as i64
    }

    /// Whether `self` comes before `other`, wrap-aware
    pub const fn is_before(self, other: HostTime) -> bool {
        self.offset_from(other) < 0
    }

    /// Distance from `earlier` to `self`, zero if `earlier` is later
    pub const fn saturating_since(self, earlier: HostTime) -> HostDelta {
        let offset = self.offset_from(earlier);
        if offset > 0 {
            HostDelta(offset as u64)
        } else {
            HostDelta(0)
        }
    }
}

/// A non-negative span of host time, in clock ticks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostDelta(u64);

impl HostDelta {
    pub const ZERO: HostDelta = HostDelta(0);

    pub const fn from_ticks(ticks: u64) -> Self {
        Self(ticks)
    }

    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Multiply by a beat count, `None` on overflow
    pub const fn checked_mul(self, count: u64) -> Option<Self> {
        match self.0.checked_mul(count) {
            Some(ticks) => Some(Self(ticks)),
            None => None,
        }
    }
}

/// Fixed tick-to-nanosecond ratio of a clock
/// `nanoseconds = ticks * numer / denom`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timebase {
    numer: u32,
    denom: u32,
}

impl Timebase {
    /// One tick per nanosecond
    pub const NANOSECONDS: Timebase = Timebase { numer: 1, denom: 1 };

    /// Create a timebase; zero terms are treated as 1
    pub fn new(numer: u32, denom: u32) -> Self {
        Self {
            numer: numer.max(1),
            denom: denom.max(1),
        }
    }

    pub fn numer(&self) -> u32 {
        self.numer
    }

    pub fn denom(&self) -> u32 {
        self.denom
    }

    /// Convert seconds to a host delta
    /// Negative, NaN and infinite inputs give a zero delta
    pub fn to_host_delta(&self, seconds: f64) -> HostDelta {
        if !seconds.is_finite() || seconds <= 0.0 {
            return HostDelta::ZERO;
        }
        let nanos = seconds * NANOS_PER_SECOND;
        let ticks = nanos * self.denom as f64 / self.numer as f64;
        // `as` saturates at u64::MAX for huge values
        HostDelta(ticks.round() as u64)
    }

    /// Convert a host delta to seconds
    pub fn to_seconds(&self, delta: HostDelta) -> f64 {
        let nanos = delta.0 as f64 * self.numer as f64 / self.denom as f64;
        nanos / NANOS_PER_SECOND
    }

    /// Host time `seconds` after `t`
    pub fn add_seconds(&self, t: HostTime, seconds: f64) -> HostTime {
        t.wrapping_add(self.to_host_delta(seconds))
    }

    /// Signed seconds from `from` to `to`, computed on the integer difference
    pub fn seconds_between(&self, from: HostTime, to: HostTime) -> f64 {
        if !to.is_before(from) {
            self.to_seconds(to.saturating_since(from))
        } else {
            -self.to_seconds(from.saturating_since(to))
        }
    }
}

impl Default for Timebase {
    fn default() -> Self {
        Self::NANOSECONDS
    }
}

/// Source of "now" in the host time domain
///
/// The timebase of a clock never changes during its lifetime, so every
/// conversion within a session uses the same ratio.
pub trait HostClock: Send + Sync {
    /// Current host time
    fn now(&self) -> HostTime;

    /// Tick ratio of this clock
    fn timebase(&self) -> Timebase;

    fn to_host_delta(&self, seconds: f64) -> HostDelta {
        self.timebase().to_host_delta(seconds)
    }

    fn to_seconds(&self, delta: HostDelta) -> f64 {
        self.timebase().to_seconds(delta)
    }

    fn add_seconds(&self, t: HostTime, seconds: f64) -> HostTime {
        self.timebase().add_seconds(t, seconds)
    }

    /// Signed seconds from now until `t` (negative if `t` is in the past)
    fn seconds_until(&self, t: HostTime) -> f64 {
        self.timebase().seconds_between(self.now(), t)
    }

    /// Wall-clock delay until `t`, clamped to zero for past times
    fn delay_until(&self, t: HostTime) -> Duration {
        Duration::from_secs_f64(self.seconds_until(t).max(0.0))
    }
}

/// Monotonic clock backed by `std::time::Instant`
/// Ticks are nanoseconds since the clock was created; clones share the anchor
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock for MonotonicClock {
    fn now(&self) -> HostTime {
        let nanos = self.origin.elapsed().as_nanos();
        HostTime(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    fn timebase(&self) -> Timebase {
        Timebase::NANOSECONDS
    }
}

/// Clock driven by hand, for deterministic tests and offline rendering
/// Clones share the same time
#[derive(Debug, Clone)]
pub struct ManualClock {
    ticks: Arc<AtomicU64>,
    timebase: Timebase,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::with_timebase(Timebase::NANOSECONDS)
    }

    pub fn with_timebase(timebase: Timebase) -> Self {
        Self {
            ticks: Arc::new(AtomicU64::new(0)),
            timebase,
        }
    }

    /// Jump to an absolute host time
    pub fn set(&self, t: HostTime) {
        self.ticks.store(t.ticks(), Ordering::Release);
    }

    /// Move forward by a host delta
    pub fn advance(&self, delta: HostDelta) {
        self.ticks.fetch_add(delta.ticks(), Ordering::AcqRel);
    }

    /// Move forward by a number of seconds
    pub fn advance_seconds(&self, seconds: f64) {
        self.advance(self.timebase.to_host_delta(seconds));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock for ManualClock {
    fn now(&self) -> HostTime {
        HostTime(self.ticks.load(Ordering::Acquire))
    }

    fn timebase(&self) -> Timebase {
        self.timebase
    }
}
