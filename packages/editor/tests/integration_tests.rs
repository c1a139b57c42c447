//! Integration tests for the editor crate: full action cycles through the
//! public session API.

use std::sync::Mutex;
use std::time::Duration;

use inkflow_editor::{
    decode_all, ActionKind, ActionRequest, ByteStream, CycleStatus, DocumentStore,
    EditSession, EditableDocument, EditorError, EntryKind, FileStore, GenerationService,
    ReplayService, Role, SnapshotIndex, TextDocument, TransportError,
};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

/// Serves bytes pushed through a channel, so tests control arrival timing
struct ChannelService {
    rx: Mutex<Option<mpsc::Receiver<Result<Vec<u8>, TransportError>>>>,
}

impl ChannelService {
    fn new() -> (Self, mpsc::Sender<Result<Vec<u8>, TransportError>>) {
        let (tx, rx) = mpsc::channel(16);
        (
            Self {
                rx: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

impl GenerationService for ChannelService {
    async fn generate(&self, _request: &ActionRequest) -> Result<ByteStream, TransportError> {
        let rx = self.rx.lock().unwrap().take();
        match rx {
            Some(rx) => Ok(Box::pin(ReceiverStream::new(rx))),
            None => Err(TransportError::Failed("response already consumed".to_string())),
        }
    }
}

/// Never answers
struct SilentService;

impl GenerationService for SilentService {
    async fn generate(&self, _request: &ActionRequest) -> Result<ByteStream, TransportError> {
        std::future::pending().await
    }
}

fn selected(text: &str) -> EditSession<TextDocument> {
    let len = text.chars().count();
    EditSession::new("it", TextDocument::new(text).with_selection(0, len))
}

// ========== Decoding ==========

#[test]
fn test_concrete_split_example() {
    let deltas = decode_all(["0:\"Hel", "lo\"\n0:\" World\"\n"]);
    assert_eq!(deltas, vec!["Hello", " World"]);
}

// ========== Action cycles ==========

#[tokio::test]
async fn test_expand_replaces_selection() {
    let mut session = EditSession::new(
        "it",
        TextDocument::new("Intro. Make this longer. Outro.").with_selection(7, 24),
    );
    let service =
        ReplayService::from_deltas(["A much", " longer", " sentence."]).with_chunk_size(5);

    let outcome = session.run_action(&service, "expand", None).await.unwrap();

    assert_eq!(outcome.status, CycleStatus::Completed);
    assert_eq!(outcome.deltas, 3);
    assert_eq!(
        session.document().as_str(),
        "Intro. A much longer sentence. Outro."
    );

    let sent = service.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].action, ActionKind::Expand);
    assert_eq!(sent[0].text, "Make this longer.");
    assert_eq!(sent[0].custom_instruction, None);
}

#[tokio::test]
async fn test_transcript_mirrors_cycle() {
    let mut session = selected("Bonjour");
    let service = ReplayService::from_deltas(["Hello", " World"]);

    let outcome = session
        .run_action(&service, "translate", None)
        .await
        .unwrap();

    let entries = session.transcript().entries();
    assert_eq!(entries.len(), 3);
    assert_eq!((entries[0].role, entries[0].kind), (Role::User, EntryKind::Request));
    assert_eq!(entries[0].text(), "Translate to English");
    assert_eq!((entries[1].role, entries[1].kind), (Role::Assistant, EntryKind::Intent));
    assert_eq!((entries[2].role, entries[2].kind), (Role::Assistant, EntryKind::Content));
    assert_eq!(entries[2].text(), "Hello World");
    assert!(!entries[2].is_open());

    let entry = outcome.entry.unwrap();
    assert_eq!(session.transcript().snapshot_of(entry), Ok(SnapshotIndex(0)));
    assert_eq!(session.snapshots().get(SnapshotIndex(0)).unwrap(), "Hello World");
}

#[tokio::test]
async fn test_custom_action_forwards_instruction() {
    let mut session = selected("draft");
    let service = ReplayService::from_deltas(["DRAFT"]);

    session
        .run_action(&service, "custom", Some("  shout it  "))
        .await
        .unwrap();

    let sent = service.requests();
    assert_eq!(sent[0].custom_instruction.as_deref(), Some("shout it"));
    assert_eq!(session.transcript().entries()[0].text(), "Custom Prompt: shout it");
}

#[tokio::test]
async fn test_continue_writing_appends_at_cursor() {
    let mut session = EditSession::new("it", TextDocument::new("Once upon a time"));
    let service = ReplayService::from_deltas([", there was a crate."]);

    session
        .run_action(&service, "continue", None)
        .await
        .unwrap();

    assert_eq!(
        session.document().as_str(),
        "Once upon a time, there was a crate."
    );
    assert_eq!(service.requests()[0].text, "Once upon a time");
}

#[tokio::test]
async fn test_malformed_lines_do_not_abort_cycle() {
    let mut session = selected("x");
    let body = "0:\"one\"\n0:{bad\n2:[\"meta\"]\n0:\" two\"\n";
    let service = ReplayService::new(body).with_chunk_size(4);

    let outcome = session.run_action(&service, "summarize", None).await.unwrap();
    assert_eq!(outcome.deltas, 2);
    assert_eq!(session.document().as_str(), "one two");
}

// ========== Validation and failures ==========

#[tokio::test]
async fn test_rejected_before_any_io() {
    let mut session = selected("text");
    let service = ReplayService::from_deltas(["never"]);

    let err = session.run_action(&service, "custom", Some("   ")).await.unwrap_err();
    assert!(matches!(err, EditorError::Validation(_)));

    let err = session.run_action(&service, "improve", None).await.unwrap_err();
    assert!(matches!(err, EditorError::UnsupportedAction(_)));

    assert!(service.requests().is_empty());
    assert!(session.transcript().is_empty());
    assert_eq!(session.document().as_str(), "text");
}

#[tokio::test]
async fn test_missing_body_leaves_document_untouched() {
    let mut session = selected("keep me");
    let service = ReplayService::without_body();

    let err = session.run_action(&service, "expand", None).await.unwrap_err();

    assert!(matches!(err, EditorError::Transport(TransportError::MissingBody)));
    assert_eq!(session.document().as_str(), "keep me");
    assert!(session.snapshots().is_empty());
    assert!(!session.is_busy());
    // Request and intent were logged; no content entry was opened
    assert_eq!(session.transcript().len(), 2);
}

#[tokio::test]
async fn test_interrupted_stream_keeps_applied_deltas() {
    let mut session = selected("old");
    let body: String = ["0:\"first\"\n", "0:\" second\"\n", "0:\" third\"\n"].concat();
    let service = ReplayService::new(body).with_chunk_size(11).interrupt_after(1);

    let err = session.run_action(&service, "expand", None).await.unwrap_err();

    assert!(matches!(err, EditorError::Transport(TransportError::Interrupted(_))));
    assert_eq!(session.document().as_str(), "first");
    let content = &session.transcript().entries()[2];
    assert_eq!(content.text(), "first");
    assert!(!content.is_open());
    assert_eq!(session.snapshots().len(), 1);
    assert!(!session.is_busy());
}

// ========== Cancellation ==========

#[tokio::test]
async fn test_cancel_flushes_buffered_line() {
    let mut session = selected("old");
    let (service, tx) = ChannelService::new();
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

    let run = session.run_action_until(&service, "expand", None, async {
        let _ = cancel_rx.await;
    });
    let driver = async {
        tx.send(Ok(b"0:\"Hello\"\n".to_vec())).await.unwrap();
        // Unterminated: only a flush can deliver it
        tx.send(Ok(b"0:\" World\"".to_vec())).await.unwrap();
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
        cancel_tx.send(()).unwrap();
        // Keep the sender alive so the stream never ends on its own
        tx
    };
    let (outcome, _tx) = tokio::join!(run, driver);
    let outcome = outcome.unwrap();

    assert_eq!(outcome.status, CycleStatus::Cancelled);
    assert_eq!(outcome.deltas, 2);
    assert_eq!(session.document().as_str(), "Hello World");
    assert_eq!(session.snapshots().len(), 1);
    assert!(!session.is_busy());
}

#[tokio::test]
async fn test_cancel_while_waiting_for_response() {
    let mut session = selected("old");
    let cancel = tokio::time::sleep(Duration::from_millis(20));

    let outcome = session
        .run_action_until(&SilentService, "expand", None, cancel)
        .await
        .unwrap();

    assert_eq!(outcome.status, CycleStatus::Cancelled);
    assert_eq!(outcome.entry, None);
    assert_eq!(outcome.deltas, 0);
    assert_eq!(outcome.snapshot, None);
    // The selection is only cleared once a body exists
    assert_eq!(session.document().as_str(), "old");
    assert_eq!(session.transcript().len(), 2);
    assert!(!session.is_busy());
}

// ========== Snapshots and rollback ==========

#[tokio::test]
async fn test_each_cycle_captures_one_snapshot() {
    let mut session = selected("v0");
    for n in 1..=3 {
        session.edit(|doc| doc.select_all()).unwrap();
        let service =
            ReplayService::from_deltas(["v".to_string(), n.to_string()]).with_chunk_size(2);
        let outcome = session.run_action(&service, "summarize", None).await.unwrap();
        assert_eq!(outcome.snapshot, Some(SnapshotIndex(n - 1)));
    }

    assert_eq!(session.snapshots().len(), 3);
    let texts: Vec<_> = session
        .snapshots()
        .iter()
        .map(|(_, snapshot)| snapshot.text.clone())
        .collect();
    assert_eq!(texts, vec!["v1", "v2", "v3"]);
}

#[tokio::test]
async fn test_rollback_to_entry_then_undo() {
    let mut session = selected("start");
    let service = ReplayService::from_deltas(["first"]);
    let first = session.run_action(&service, "summarize", None).await.unwrap();

    session.edit(|doc| doc.select_all()).unwrap();
    let service = ReplayService::from_deltas(["second"]);
    session.run_action(&service, "summarize", None).await.unwrap();

    session.edit(|doc| doc.insert_at_cursor(" edited")).unwrap();
    let before = session.document().as_str().to_string();

    session.rollback_to_entry(first.entry.unwrap()).unwrap();
    assert_eq!(session.document().as_str(), "first");
    assert!(session.can_undo());

    assert!(session.undo().unwrap());
    assert_eq!(session.document().as_str(), before);
    assert!(!session.undo().unwrap());
}

#[tokio::test]
async fn test_rollback_out_of_range() {
    let mut session = selected("text");
    let err = session.rollback(SnapshotIndex(0)).unwrap_err();
    assert!(matches!(
        err,
        EditorError::IndexOutOfRange { index: SnapshotIndex(0), len: 0 }
    ));
    assert_eq!(session.document().as_str(), "text");
}

// ========== Persistence ==========

#[tokio::test]
async fn test_file_store_autosave() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.txt");
    std::fs::write(&path, "from disk").unwrap();

    let mut session =
        EditSession::with_store("it", TextDocument::new(""), FileStore::new(&path)).unwrap();
    assert_eq!(session.document().as_str(), "from disk");

    session.edit(|doc| doc.select_all()).unwrap();
    let service = ReplayService::from_deltas(["rewritten"]);
    let outcome = session.run_action(&service, "summarize", None).await.unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "rewritten");

    session.rollback(outcome.snapshot.unwrap()).unwrap();
    session.undo().unwrap();
    let reloaded = FileStore::new(&path).load().unwrap();
    assert_eq!(reloaded.as_deref(), Some("rewritten"));
}
