//! Error types for the taranga radar engine.

use thiserror::Error;

/// Errors surfaced by the radar engine.
///
/// No variant is fatal to the engine itself: a failed frame never corrupts
/// state for subsequent frames, and fatality is the caller's decision.
#[derive(Error, Debug)]
pub enum RadarError {
    #[error("vehicle configuration error: {0}")]
    Config(String),

    #[error("processing pipeline has not been initialized")]
    NotInitialized,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RadarError>;
