//! Error types for solo-ap
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for solo-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration resolution errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Track id cannot name a playable resource
    #[error("Invalid track: {0}")]
    InvalidTrack(String),

    /// Track id resolved to nothing in the library
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Media backend failed to construct or control a handle
    #[error("Backend error: {0}")]
    Backend(String),

    /// The handle already played to its end and can only be replaced
    #[error("Media handle already finished")]
    HandleFinished,

    /// The playback service thread is gone
    #[error("Playback service stopped")]
    ServiceStopped,

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<solo_common::Error> for Error {
    fn from(err: solo_common::Error) -> Self {
        match err {
            solo_common::Error::Io(e) => Error::Io(e),
            solo_common::Error::Config(msg) => Error::Config(msg),
            solo_common::Error::InvalidInput(msg) => Error::InvalidTrack(msg),
            solo_common::Error::Internal(msg) => Error::Internal(msg),
        }
    }
}

/// Convenience Result type using solo-ap Error
pub type Result<T> = std::result::Result<T, Error>;
