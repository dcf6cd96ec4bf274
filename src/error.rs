//! Error types for the trainer core.
//!
//! "No detection" is never an error: quiet, aperiodic and out-of-range buffers
//! come back as `PitchEstimate::none()`. The variants here cover caller bugs
//! (bad buffers, bad parameters) and recoverable calibration/config problems.

use thiserror::Error;

/// Result type for estimator calls.
pub type PitchResult<T> = Result<T, PitchError>;

/// Contract violations at the estimator boundary.
#[derive(Debug, Error, PartialEq)]
pub enum PitchError {
    /// Buffer too short to hold the difference/correlation tables.
    #[error("buffer of {len} samples is too short (need at least {min})")]
    BufferTooShort { len: usize, min: usize },

    /// Sample rate is zero, negative, or not finite.
    #[error("invalid sample rate: {rate} Hz")]
    InvalidSampleRate { rate: f64 },

    /// Estimator parameter outside its valid domain.
    #[error("invalid estimator parameter '{name}': {message}")]
    InvalidParameter { name: &'static str, message: String },
}

impl PitchError {
    pub fn invalid_param(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}

/// Reasons a calibration sample run is thrown away.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CalibrationError {
    #[error("no pitch samples collected")]
    NoSamples,

    /// A sample was further than the rejection gate from the expected open
    /// string; the player is most likely holding the wrong string or note.
    #[error("sample {deviation_cents:+.1} cents from expected open string (limit ±{limit_cents:.0})")]
    WrongNote {
        deviation_cents: f64,
        limit_cents: f64,
    },

    #[error("string {0} is not on the fretboard")]
    UnknownString(u8),
}

/// Failures loading or saving JSON configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
