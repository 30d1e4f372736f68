// Sequencer module - Beat scheduling
// Tempo and meter, the transport, the lookahead scheduler, tap tempo and the
// threaded control surface built on them

pub mod metronome;
pub mod scheduler;
pub mod tap_tempo;
pub mod timeline;
pub mod transport;

pub use metronome::{Metronome, MetronomeError};
pub use scheduler::{BeatEvent, BeatScheduler, ScheduleCursor, TickSummary};
pub use tap_tempo::TapTempo;
pub use timeline::{Meter, Tempo};
pub use transport::TransportState;
