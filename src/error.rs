//! Crate-wide error types.

use thiserror::Error;

use crate::speech::SynthesisError;

/// Top-level error for the library surface.
#[derive(Error, Debug)]
pub enum SpeakpadError {
    /// Errors bubbled up from helpers that already use `anyhow`
    #[error(transparent)]
    General(#[from] anyhow::Error),

    /// Speech platform failure
    #[error("Speech platform error: {0}")]
    Synthesis(SynthesisError),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The session loop is no longer running
    #[error("Session is closed")]
    SessionClosed,
}

impl SpeakpadError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }
}

pub type SpeakpadResult<T> = Result<T, SpeakpadError>;
