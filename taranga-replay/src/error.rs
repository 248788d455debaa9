//! Error types for the replay binary.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("radar engine error: {0}")]
    Radar(#[from] taranga_radar::RadarError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no readable input streams")]
    NoInputs,
}

pub type Result<T> = std::result::Result<T, ReplayError>;
