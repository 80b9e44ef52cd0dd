use thiserror::Error;

use crate::types::SourceChannel;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid ticket: {0}")]
    InvalidTicket(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{channel} index unavailable: {reason}")]
    IndexUnavailable { channel: SourceChannel, reason: String },

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Record store failed: {0}")]
    Store(String),

    #[error("{what} timed out after {secs}s")]
    Timeout { what: String, secs: u64 },
}

impl Error {
    pub fn index_unavailable(channel: SourceChannel, reason: impl std::fmt::Display) -> Self {
        Self::IndexUnavailable { channel, reason: reason.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
