// src/ingest/error.rs
use std::time::Duration;

use thiserror::Error;

/// Transient transport failure. Retried per the source's retry policy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("empty response body")]
    EmptyBody,
}

impl NetworkError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, NetworkError::Timeout(_))
    }
}

/// Payload could not be read as the expected shape at all. Never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{format} payload: {reason}")]
pub struct FormatError {
    pub format: &'static str,
    pub reason: String,
}

impl FormatError {
    pub fn new(format: &'static str, reason: impl Into<String>) -> Self {
        Self {
            format,
            reason: reason.into(),
        }
    }
}

/// Final per-source outcome of `Aggregator::fetch_one`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("source {source_id} unavailable after {attempts} attempt(s): {last}")]
    Unavailable {
        source_id: String,
        attempts: u32,
        last: NetworkError,
    },

    #[error("source {source_id} returned unreadable data: {error}")]
    Format {
        source_id: String,
        error: FormatError,
    },
}

impl SourceError {
    pub fn source_id(&self) -> &str {
        match self {
            SourceError::Unavailable { source_id, .. } => source_id,
            SourceError::Format { source_id, .. } => source_id,
        }
    }
}
