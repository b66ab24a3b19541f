//! Error types for srs-core.

use thiserror::Error;

/// Result type alias using SchedulerError.
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Errors that can occur while scheduling reviews.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("quality {quality} outside the 0-5 rating range")]
    InvalidQuality { quality: u8 },

    #[error("unknown card id {id}")]
    UnknownCard { id: String },

    #[error("store error: {0}")]
    Store(String),
}
