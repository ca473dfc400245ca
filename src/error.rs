//! Error taxonomy shared by every engine API.

use std::time::Duration;

/// Convenience result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
///
/// Configuration problems fail fast and are never retried. Range errors leave
/// the target untouched. [`Error::SinkUnavailable`] is fatal to the scheduler
/// loop that raised it.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration (palette, fps, scale mode, font type...).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Chain index outside `[0, len)`.
    #[error("index {index} is out of range 0..{len}")]
    Range { index: usize, len: usize },

    /// Image or font asset could not be read or decoded.
    #[error("resource error: {0}")]
    Resource(String),

    /// The display never became ready, or went away.
    #[error("display sink not ready after {0:?}")]
    SinkUnavailable(Duration),

    /// Sequence construction failed.
    #[error("sequence error: {0}")]
    Sequence(#[from] SequenceError),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Build an [`Error::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build an [`Error::Resource`] value.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }
}

/// Sequence validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceError {
    /// No animation units provided.
    EmptySequence,
}

impl core::fmt::Display for SequenceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SequenceError::EmptySequence => {
                write!(f, "sequence must have at least one animation unit")
            }
        }
    }
}

impl std::error::Error for SequenceError {}
