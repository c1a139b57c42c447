//! Error types for the editor

use thiserror::Error;

use crate::snapshots::SnapshotIndex;
use crate::transcript::EntryHandle;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid handle: {0}")]
    InvalidHandle(#[from] InvalidHandle),

    #[error("Snapshot index {index} out of range ({len} snapshots)")]
    IndexOutOfRange { index: SnapshotIndex, len: usize },

    #[error("Another AI action is already in flight")]
    Busy,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejections raised before any request leaves the session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Custom prompt requires a non-empty instruction")]
    MissingInstruction,

    #[error("{0} requires selected text")]
    EmptySelection(&'static str),
}

/// Failures reported by the generation service collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("No response body")]
    MissingBody,

    #[error("Request failed: {0}")]
    Failed(String),

    #[error("Stream interrupted: {0}")]
    Interrupted(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidHandle {
    #[error("No transcript entry for {0}")]
    UnknownEntry(EntryHandle),

    #[error("Transcript entry {0} is closed")]
    ClosedEntry(EntryHandle),

    #[error("Transcript entry {0} is not assistant content")]
    NotContent(EntryHandle),

    #[error("Transcript entry {0} has no snapshot")]
    NoSnapshot(EntryHandle),

    #[error("Transcript entry {0} already owns a snapshot")]
    SnapshotAttached(EntryHandle),

    #[error("Stale action ticket {0}")]
    StaleTicket(u64),
}

/// A `0:` line whose payload is not a JSON string.
///
/// Never escapes the decoder: the line is dropped and decoding continues.
#[derive(Error, Debug)]
#[error("Malformed delta line {line:?}: {source}")]
pub struct DecodeError {
    pub line: String,
    #[source]
    pub source: serde_json::Error,
}
