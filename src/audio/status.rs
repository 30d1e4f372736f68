// Sink status - Health of an output pathway, shared between threads

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkStatus {
    /// No hardware, every request is a no-op
    Unavailable = 0,
    Starting = 1,
    Ready = 2,
    /// Last operation failed; the sink keeps accepting requests
    Faulted = 3,
}

impl From<u8> for SinkStatus {
    fn from(value: u8) -> Self {
        match value {
            1 => SinkStatus::Starting,
            2 => SinkStatus::Ready,
            3 => SinkStatus::Faulted,
            _ => SinkStatus::Unavailable,
        }
    }
}

/// Atomic wrapper so the real-time side can report without locking
#[derive(Debug, Clone)]
pub struct AtomicSinkStatus {
    inner: Arc<AtomicU8>,
}

impl AtomicSinkStatus {
    pub fn new(status: SinkStatus) -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(status as u8)),
        }
    }

    pub fn get(&self) -> SinkStatus {
        SinkStatus::from(self.inner.load(Ordering::Relaxed))
    }

    pub fn set(&self, status: SinkStatus) {
        self.inner.store(status as u8, Ordering::Relaxed);
    }
}

impl Default for AtomicSinkStatus {
    fn default() -> Self {
        Self::new(SinkStatus::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip_through_clones() {
        let status = AtomicSinkStatus::new(SinkStatus::Starting);
        let shared = status.clone();
        shared.set(SinkStatus::Faulted);
        assert_eq!(status.get(), SinkStatus::Faulted);
    }

    #[test]
    fn test_unknown_value_maps_to_unavailable() {
        assert_eq!(SinkStatus::from(200), SinkStatus::Unavailable);
    }
}
