//! Error types for hanse-cdn.

use std::fmt;

use thiserror::Error;

use hanse_keys::ProcessError;

pub type Result<T> = std::result::Result<T, CdnError>;

/// Which time budget a pipeline call ran out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Sending the request and receiving response headers.
    Request,
    /// Reading the response body.
    ResponseBody,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Request => f.write_str("request"),
            Phase::ResponseBody => f.write_str("response body"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CdnError {
    #[error("request to {url} failed with status {status}")]
    RequestFailed { status: u16, url: String },

    #[error("{phase} phase exceeded its time budget")]
    Timeout { phase: Phase },

    #[error("length mismatch: expected {declared} body bytes, got {actual}")]
    LengthMismatch { declared: u64, actual: u64 },

    #[error("destination buffer too small: need {needed} bytes, have {capacity}")]
    BufferTooSmall { needed: usize, capacity: usize },

    #[error("chunk metadata carries no chunk id")]
    MissingChunkId,

    #[error("no content length and no chunk metadata to size the transfer")]
    UnknownTransferLength,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed manifest: {0}")]
    MalformedManifest(String),

    #[error("chunk processing failed: {0}")]
    Process(#[from] ProcessError),
}
