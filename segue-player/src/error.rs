//! Error types for segue-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//! Playback failures are recovered locally by the engine; these errors only
//! surface to callers of the control API.

use segue_common::events::TrackId;
use thiserror::Error;

/// Main error type for segue-player
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A track could not be bound to a player resource
    #[error("Cannot prepare track {track}: {reason}")]
    Prepare { track: TrackId, reason: String },

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The engine task has exited and no longer accepts commands
    #[error("Playback engine stopped")]
    EngineStopped,

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using segue-player Error
pub type Result<T> = std::result::Result<T, Error>;

impl From<segue_common::Error> for Error {
    fn from(err: segue_common::Error) -> Self {
        match err {
            segue_common::Error::Io(e) => Error::Io(e),
            other => Error::Config(other.to_string()),
        }
    }
}
