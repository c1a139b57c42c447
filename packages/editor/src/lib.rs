//! # Inkflow Editor
//!
//! Streams AI rewrite actions into a live document.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ actions: action name + selection → request  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ service: request → byte stream              │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ decoder: bytes → `0:` lines → text deltas   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ session: one action cycle at a time         │
//! │  - Replace the selection delta by delta     │
//! │  - Mirror every delta into the transcript   │
//! │  - Snapshot the document when a cycle ends  │
//! │  - Autosave through a DocumentStore         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ rollback: snapshot ↔ live document, undo    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **One action in flight**: a second request is rejected, never queued
//! 2. **Deltas land atomically**: document insert and transcript append commit together
//! 3. **Snapshots are paired with entries**: each content entry owns at most one
//! 4. **Undo is single-level**: only the latest rollback can be undone
//!
//! ## Usage
//!
//! ```rust,ignore
//! use inkflow_editor::{EditSession, ReplayService, TextDocument};
//!
//! let doc = TextDocument::new("Make this longer.").with_selection(0, 17);
//! let mut session = EditSession::new("local", doc);
//!
//! let service = ReplayService::from_deltas(["Hello", " World"]);
//! let outcome = session.run_action(&service, "expand", None).await?;
//!
//! assert_eq!(session.document().as_str(), "Hello World");
//!
//! // Go back to any finished action, then change your mind
//! session.rollback(outcome.snapshot.unwrap())?;
//! session.undo()?;
//! ```

mod actions;
mod decoder;
mod document;
mod errors;
mod persistence;
mod rollback;
mod service;
mod session;
mod snapshots;
mod transcript;

pub use actions::{
    dispatch, source_text, ActionKind, ActionRequest, CONTINUE_CONTEXT_CHARS, FALLBACK_INTENT,
};
pub use decoder::{decode_all, decode_line, DeltaStream, StreamDecoder, DELTA_PREFIX};
pub use document::{EditableDocument, TextDocument};
pub use errors::{DecodeError, EditorError, InvalidHandle, TransportError, ValidationError};
pub use persistence::{DocumentStore, FileStore, MemoryStore};
pub use rollback::{RollbackController, RollbackState};
pub use service::{encode_delta, ByteStream, GenerationService, ReplayService};
pub use session::{ActionTicket, CycleOutcome, CycleStatus, EditSession};
pub use snapshots::{Snapshot, SnapshotIndex, SnapshotStore};
pub use transcript::{EntryHandle, EntryKind, Role, TranscriptEntry, TranscriptLog};
