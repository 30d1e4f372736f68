// Transport - Stopped / Running

/// Transport state
/// The only transitions are Stopped -> Running (start) and Running -> Stopped (stop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Running,
}

impl TransportState {
    pub fn is_running(&self) -> bool {
        matches!(self, TransportState::Running)
    }

    /// Enter Running; `None` if already running
    pub fn start(self) -> Option<Self> {
        match self {
            TransportState::Stopped => Some(TransportState::Running),
            TransportState::Running => None,
        }
    }

    /// Enter Stopped; `None` if already stopped
    pub fn stop(self) -> Option<Self> {
        match self {
            TransportState::Running => Some(TransportState::Stopped),
            TransportState::Stopped => None,
        }
    }
}
