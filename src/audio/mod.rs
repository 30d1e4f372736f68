// Audio module - Host clock, click synthesis and sample-accurate output

pub mod click;
pub mod clock;
pub mod engine;
pub mod mixer;
pub mod sink;
pub mod status;

use thiserror::Error;

/// Failures opening the audio output
/// None of them stop the metronome: callers fall back to a silent sink
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("No audio output device found")]
    NoOutputDevice,

    #[error("Audio configuration error: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("Unsupported sample format: {0}. Supported formats: F32, I16, U16")]
    UnsupportedFormat(String),

    #[error("Failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}
