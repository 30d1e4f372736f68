// UI module - Presentation-side beat consumers

pub mod pulse;

pub use pulse::PulseMonitor;
