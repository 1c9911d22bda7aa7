//! Typed error hierarchy for the sync core.
//!
//! Two enums cover the two layers:
//! - `FrameError`: STOMP frame decoding on the wire
//! - `SyncError`: item store, fetch and inbound message failures
//!
//! The realtime adapter never surfaces these to its callers; it logs them and
//! keeps going. They exist so that the lower layers stay testable.

use thiserror::Error;

/// Errors from decoding a raw STOMP frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame is empty")]
    Empty,

    #[error("Unknown STOMP command '{0}'")]
    UnknownCommand(String),

    #[error("Malformed header line '{0}'")]
    MalformedHeader(String),

    #[error("Invalid escape sequence in header '{0}'")]
    InvalidEscape(String),

    #[error("Frame is missing the header/body separator")]
    MissingSeparator,
}

/// Errors from the sync core's collaborators.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No token stored for {url}")]
    MissingToken { url: String },

    #[error("Item {id} not found")]
    ItemNotFound { id: i64 },

    #[error("Could not decode {kind} message: {source}")]
    Decode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not encode {kind}: {source}")]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Fetching {path} failed: {message}")]
    Fetch { path: String, message: String },

    #[error(transparent)]
    Frame(#[from] FrameError),
}
