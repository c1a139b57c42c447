//! # Edit Session
//!
//! Owns one document together with its transcript, snapshot history and
//! rollback state, and runs AI actions against it one at a time.
//!
//! ## Action cycle
//!
//! ```text
//! begin_action ──→ open_stream ──→ apply_delta × N ──→ finish
//!   │ validate        │ delete         │ insert + append    │ close entry
//!   │ request entry   │ selection      │ (one step)         │ capture snapshot
//!   │ intent entry    │ content entry  │ autosave           │
//!   └─ busy           │                │                    └─ idle
//! ```
//!
//! While a cycle is in flight the session owns the document: a second
//! `begin_action`, rollback, restore, undo or direct edit fails with
//! [`EditorError::Busy`]. Requests are rejected, not queued.
//!
//! A cycle that fails or is cancelled midway keeps the text it already
//! inserted; its entry is closed and, when at least one delta landed, it gets
//! a snapshot like a completed cycle.

use std::future::Future;

use tokio_stream::StreamExt;

use crate::actions::{source_text, ActionKind, ActionRequest};
use crate::decoder::DeltaStream;
use crate::document::EditableDocument;
use crate::errors::{EditorError, InvalidHandle};
use crate::persistence::DocumentStore;
use crate::rollback::{RollbackController, RollbackState};
use crate::service::GenerationService;
use crate::snapshots::{SnapshotIndex, SnapshotStore};
use crate::transcript::{EntryHandle, EntryKind, Role, TranscriptLog};

/// Proof that the holder started the in-flight action cycle
#[derive(Debug)]
pub struct ActionTicket {
    id: u64,
    request: ActionRequest,
    selection: (usize, usize),
    content: Option<EntryHandle>,
    deltas: usize,
}

impl ActionTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn request(&self) -> &ActionRequest {
        &self.request
    }

    /// Content entry, once the stream is open
    pub fn content(&self) -> Option<EntryHandle> {
        self.content
    }

    pub fn deltas(&self) -> usize {
        self.deltas
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    Completed,
    Cancelled,
    Failed,
}

/// What a closed cycle left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub status: CycleStatus,
    pub entry: Option<EntryHandle>,
    pub snapshot: Option<SnapshotIndex>,
    pub deltas: usize,
}

/// Single-document AI editing session
pub struct EditSession<D> {
    /// Unique session identifier
    pub id: String,

    document: D,
    transcript: TranscriptLog,
    snapshots: SnapshotStore,
    controller: RollbackController,
    store: Option<Box<dyn DocumentStore>>,

    /// Ticket id of the cycle in flight
    in_flight: Option<u64>,
    next_ticket: u64,
}

impl<D: EditableDocument> EditSession<D> {
    pub fn new(id: impl Into<String>, document: D) -> Self {
        Self {
            id: id.into(),
            document,
            transcript: TranscriptLog::new(),
            snapshots: SnapshotStore::new(),
            controller: RollbackController::new(),
            store: None,
            in_flight: None,
            next_ticket: 1,
        }
    }

    /// Create a session backed by `store`.
    ///
    /// Saved text, if any, replaces the initial document content. From then on
    /// every committed mutation is saved.
    pub fn with_store(
        id: impl Into<String>,
        mut document: D,
        store: impl DocumentStore + 'static,
    ) -> Result<Self, EditorError> {
        if let Some(saved) = store.load()? {
            document.replace_all(&saved);
        }
        let mut session = Self::new(id, document);
        session.store = Some(Box::new(store));
        Ok(session)
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn transcript(&self) -> &TranscriptLog {
        &self.transcript
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn rollback_state(&self) -> &RollbackState {
        self.controller.state()
    }

    pub fn can_undo(&self) -> bool {
        self.controller.can_undo()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Edit the document directly, outside of any action cycle
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut D) -> R) -> Result<R, EditorError> {
        self.ensure_idle()?;
        let result = f(&mut self.document);
        self.autosave();
        Ok(result)
    }

    /// Validate an action and open its cycle.
    ///
    /// Reads the selection once; nothing touches the document until
    /// [`open_stream`](Self::open_stream).
    pub fn begin_action(
        &mut self,
        action: &str,
        instruction: Option<&str>,
    ) -> Result<ActionTicket, EditorError> {
        self.ensure_idle()?;

        let kind = ActionKind::parse(action)?;
        let selection = self.document.selection();
        let text = source_text(kind, &self.document.text(), selection.0, selection.1);
        let request = ActionRequest::build(kind, text, instruction)?;

        self.transcript
            .append_entry(Role::User, EntryKind::Request, request.summary());
        self.transcript
            .append_entry(Role::Assistant, EntryKind::Intent, request.intent());

        let id = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some(id);
        tracing::info!(session = %self.id, ticket = id, action = kind.label(), "action started");

        Ok(ActionTicket {
            id,
            request,
            selection,
            content: None,
            deltas: 0,
        })
    }

    /// The response body arrived: clear the selection and open the content entry
    pub fn open_stream(&mut self, ticket: &mut ActionTicket) -> Result<EntryHandle, EditorError> {
        self.ensure_current(ticket)?;
        if let Some(handle) = ticket.content {
            return Ok(handle);
        }

        let (start, end) = ticket.selection;
        self.document.delete_range(start, end);
        let handle = self
            .transcript
            .append_entry(Role::Assistant, EntryKind::Content, "");
        ticket.content = Some(handle);
        self.autosave();
        Ok(handle)
    }

    /// Commit one delta to the transcript and the document.
    ///
    /// Opens the stream first if that has not happened yet.
    pub fn apply_delta(
        &mut self,
        ticket: &mut ActionTicket,
        delta: &str,
    ) -> Result<(), EditorError> {
        let handle = self.open_stream(ticket)?;
        self.transcript.append_delta(handle, delta)?;
        self.document.insert_at_cursor(delta);
        ticket.deltas += 1;
        self.autosave();
        Ok(())
    }

    /// Close a cycle whose stream ended normally
    pub fn finish(&mut self, ticket: ActionTicket) -> Result<CycleOutcome, EditorError> {
        self.close_cycle(ticket, CycleStatus::Completed)
    }

    /// Close a cycle that was cancelled or failed, keeping what was applied
    pub fn abort(
        &mut self,
        ticket: ActionTicket,
        status: CycleStatus,
    ) -> Result<CycleOutcome, EditorError> {
        self.close_cycle(ticket, status)
    }

    /// Run one action end to end
    pub async fn run_action<G>(
        &mut self,
        service: &G,
        action: &str,
        instruction: Option<&str>,
    ) -> Result<CycleOutcome, EditorError>
    where
        G: GenerationService,
    {
        self.run_action_until(service, action, instruction, std::future::pending::<()>())
            .await
    }

    /// Run one action, stopping early when `cancel` completes.
    ///
    /// Cancelling while the service has not answered yet closes the cycle with
    /// the document untouched. Once the body is streaming, deltas already
    /// decoded are still applied; the rest of the response is not read.
    pub async fn run_action_until<G, C>(
        &mut self,
        service: &G,
        action: &str,
        instruction: Option<&str>,
        cancel: C,
    ) -> Result<CycleOutcome, EditorError>
    where
        G: GenerationService,
        C: Future<Output = ()>,
    {
        let mut ticket = self.begin_action(action, instruction)?;
        tokio::pin!(cancel);

        let response = tokio::select! {
            biased;
            _ = &mut cancel => None,
            response = service.generate(ticket.request()) => Some(response),
        };
        let body = match response {
            Some(Ok(body)) => body,
            Some(Err(err)) => {
                tracing::warn!(
                    session = %self.id,
                    ticket = ticket.id,
                    error = %err,
                    "generation failed"
                );
                self.abort(ticket, CycleStatus::Failed)?;
                return Err(err.into());
            }
            None => {
                tracing::info!(session = %self.id, ticket = ticket.id, "cancelled before response");
                return self.abort(ticket, CycleStatus::Cancelled);
            }
        };
        self.open_stream(&mut ticket)?;

        let mut deltas = DeltaStream::new(body);
        let mut cancelled = false;

        loop {
            let next = tokio::select! {
                biased;
                _ = &mut cancel, if !cancelled => None,
                next = deltas.next() => Some(next),
            };
            let Some(next) = next else {
                tracing::info!(session = %self.id, ticket = ticket.id, "action cancelled");
                cancelled = true;
                deltas.close();
                continue;
            };

            match next {
                Some(Ok(delta)) => {
                    if let Err(err) = self.apply_delta(&mut ticket, &delta) {
                        self.abort(ticket, CycleStatus::Failed)?;
                        return Err(err);
                    }
                }
                Some(Err(err)) => {
                    tracing::warn!(
                        session = %self.id,
                        ticket = ticket.id,
                        applied = ticket.deltas,
                        error = %err,
                        "stream interrupted"
                    );
                    self.abort(ticket, CycleStatus::Failed)?;
                    return Err(err.into());
                }
                None => break,
            }
        }

        if deltas.skipped() > 0 {
            tracing::debug!(skipped = deltas.skipped(), "malformed lines dropped");
        }
        let status = if cancelled {
            CycleStatus::Cancelled
        } else {
            CycleStatus::Completed
        };
        self.close_cycle(ticket, status)
    }

    /// Roll the document back to the version paired with a transcript entry
    pub fn rollback_to_entry(&mut self, entry: EntryHandle) -> Result<(), EditorError> {
        let index = self.transcript.snapshot_of(entry)?;
        self.rollback(index)
    }

    pub fn rollback(&mut self, index: SnapshotIndex) -> Result<(), EditorError> {
        self.ensure_idle()?;
        self.controller
            .rollback(index, &self.snapshots, &mut self.document)?;
        self.autosave();
        Ok(())
    }

    /// Restore any version from the snapshot list
    pub fn restore(&mut self, index: SnapshotIndex) -> Result<(), EditorError> {
        self.ensure_idle()?;
        self.controller
            .restore(index, &self.snapshots, &mut self.document)?;
        self.autosave();
        Ok(())
    }

    /// Undo the last rollback or restore; `Ok(false)` when there is none
    pub fn undo(&mut self) -> Result<bool, EditorError> {
        self.ensure_idle()?;
        let undone = self.controller.undo(&mut self.document);
        if undone {
            self.autosave();
        }
        Ok(undone)
    }

    /// Release the session, then settle the content entry.
    ///
    /// Bookkeeping failures past this point are logged; the session is idle
    /// whatever happens.
    fn close_cycle(
        &mut self,
        ticket: ActionTicket,
        status: CycleStatus,
    ) -> Result<CycleOutcome, EditorError> {
        self.ensure_current(&ticket)?;
        self.in_flight = None;

        let mut snapshot = None;
        if let Some(handle) = ticket.content {
            if let Err(err) = self.transcript.close(handle) {
                tracing::warn!(session = %self.id, error = %err, "content entry not closed");
            }
            if ticket.deltas > 0 {
                snapshot = self.capture_for(handle);
            }
        }

        tracing::info!(
            session = %self.id,
            ticket = ticket.id,
            status = ?status,
            deltas = ticket.deltas,
            "action closed"
        );
        Ok(CycleOutcome {
            status,
            entry: ticket.content,
            snapshot,
            deltas: ticket.deltas,
        })
    }

    /// Capture a snapshot owned by `handle`, unless the entry cannot take one
    fn capture_for(&mut self, handle: EntryHandle) -> Option<SnapshotIndex> {
        let attachable = self
            .transcript
            .get(handle)
            .is_some_and(|entry| entry.is_content() && entry.snapshot().is_none());
        if !attachable {
            tracing::warn!(session = %self.id, entry = %handle, "entry cannot own a snapshot");
            return None;
        }

        let index = self.snapshots.capture(self.document.text());
        match self.transcript.attach_snapshot(handle, index) {
            Ok(()) => Some(index),
            Err(err) => {
                tracing::warn!(session = %self.id, error = %err, "snapshot not attached");
                None
            }
        }
    }

    fn ensure_idle(&self) -> Result<(), EditorError> {
        match self.in_flight {
            Some(_) => Err(EditorError::Busy),
            None => Ok(()),
        }
    }

    fn ensure_current(&self, ticket: &ActionTicket) -> Result<(), EditorError> {
        match self.in_flight {
            Some(id) if id == ticket.id => Ok(()),
            _ => Err(InvalidHandle::StaleTicket(ticket.id).into()),
        }
    }

    fn autosave(&mut self) {
        let Some(store) = self.store.as_mut() else {
            return;
        };
        if let Err(err) = store.save(&self.document.text()) {
            tracing::warn!(session = %self.id, error = %err, "autosave failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextDocument;
    use crate::persistence::MemoryStore;

    fn session(text: &str, start: usize, end: usize) -> EditSession<TextDocument> {
        EditSession::new("test", TextDocument::new(text).with_selection(start, end))
    }

    #[test]
    fn test_session_creation() {
        let session = session("hello", 0, 5);
        assert_eq!(session.id, "test");
        assert!(!session.is_busy());
        assert!(session.transcript().is_empty());
        assert!(session.snapshots().is_empty());
    }

    #[test]
    fn test_step_api_cycle() {
        let mut session = session("Make this longer.", 0, 17);
        let mut ticket = session.begin_action("expand", None).unwrap();
        assert!(session.is_busy());
        assert_eq!(ticket.request().text, "Make this longer.");
        // Document untouched until the body arrives
        assert_eq!(session.document().as_str(), "Make this longer.");

        let entry = session.open_stream(&mut ticket).unwrap();
        assert_eq!(session.document().as_str(), "");

        // Document and entry grow together, one delta at a time
        let mut expected = String::new();
        for delta in ["Hello", " World"] {
            session.apply_delta(&mut ticket, delta).unwrap();
            expected.push_str(delta);
            assert_eq!(session.document().as_str(), expected);
            assert_eq!(session.transcript().get(entry).unwrap().text(), expected);
        }
        let outcome = session.finish(ticket).unwrap();

        assert_eq!(outcome.status, CycleStatus::Completed);
        assert_eq!(outcome.deltas, 2);
        assert_eq!(outcome.snapshot, Some(SnapshotIndex(0)));
        assert_eq!(session.document().as_str(), "Hello World");
        assert!(!session.is_busy());

        let entries = session.transcript().entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].text(), "Expand");
        assert_eq!(entries[1].text(), ActionKind::Expand.intent());
        assert_eq!(entries[2].text(), "Hello World");
        assert!(!entries[2].is_open());
        assert_eq!(entries[2].snapshot(), Some(SnapshotIndex(0)));
    }

    #[test]
    fn test_second_action_rejected_while_busy() {
        let mut session = session("text", 0, 4);
        let ticket = session.begin_action("summarize", None).unwrap();

        assert!(matches!(session.begin_action("expand", None), Err(EditorError::Busy)));
        assert!(matches!(session.undo(), Err(EditorError::Busy)));
        assert!(matches!(session.edit(|_| ()), Err(EditorError::Busy)));
        // The rejected request left no trace
        assert_eq!(session.transcript().len(), 2);

        session.finish(ticket).unwrap();
        assert!(session.begin_action("expand", None).is_ok());
    }

    #[test]
    fn test_validation_happens_before_anything_is_logged() {
        let mut session = session("text", 0, 4);
        assert!(matches!(
            session.begin_action("custom", None),
            Err(EditorError::Validation(_))
        ));
        assert!(matches!(
            session.begin_action("rewrite-as-poem", None),
            Err(EditorError::UnsupportedAction(_))
        ));
        assert!(session.transcript().is_empty());
        assert!(!session.is_busy());
    }

    #[test]
    fn test_stale_ticket_rejected() {
        let mut first = session("a", 0, 1);
        let mut second = session("b", 0, 1);
        let mut ticket = first.begin_action("expand", None).unwrap();
        let _other = second.begin_action("expand", None).unwrap();

        // Ticket ids restart per session, so forge a foreign one
        let stale_id = ticket.id;
        ticket.id = stale_id + 100;
        assert!(matches!(
            first.apply_delta(&mut ticket, "x"),
            Err(EditorError::InvalidHandle(InvalidHandle::StaleTicket(_)))
        ));
        assert_eq!(first.document().as_str(), "a");
        ticket.id = stale_id;
        assert!(first.finish(ticket).is_ok());
    }

    #[test]
    fn test_cycle_without_deltas_takes_no_snapshot() {
        let mut session = session("keep", 0, 4);
        let mut ticket = session.begin_action("summarize", None).unwrap();
        let entry = session.open_stream(&mut ticket).unwrap();
        let outcome = session.finish(ticket).unwrap();

        assert_eq!(outcome.snapshot, None);
        assert!(session.snapshots().is_empty());
        assert!(matches!(
            session.rollback_to_entry(entry),
            Err(EditorError::InvalidHandle(InvalidHandle::NoSnapshot(_)))
        ));
    }

    #[test]
    fn test_bad_content_handle_still_releases_session() {
        let mut session = session("text", 0, 4);
        let mut ticket = session.begin_action("summarize", None).unwrap();
        // Point the ticket at the intent entry, which can neither close nor own a snapshot
        let (intent, _) = session.transcript().iter().nth(1).unwrap();
        ticket.content = Some(intent);
        ticket.deltas = 1;

        let outcome = session.finish(ticket).unwrap();

        assert!(!session.is_busy());
        assert_eq!(outcome.snapshot, None);
        assert!(session.snapshots().is_empty());
        assert!(session.begin_action("expand", None).is_ok());
    }

    #[test]
    fn test_store_seeds_document_and_records_saves() {
        let store = MemoryStore::with_text("saved draft");
        let mut session =
            EditSession::with_store("s", TextDocument::new("default"), store).unwrap();
        assert_eq!(session.document().as_str(), "saved draft");

        session.edit(|doc| doc.select_all()).unwrap();
        let mut ticket = session.begin_action("summarize", None).unwrap();
        session.apply_delta(&mut ticket, "short").unwrap();
        session.finish(ticket).unwrap();

        let store = session.store.as_ref().unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("short"));
    }
}
