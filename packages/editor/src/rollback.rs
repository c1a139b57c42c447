//! # Rollback Controller
//!
//! Swaps the live document with a stored snapshot and keeps exactly one
//! compensating copy so the swap can be undone.
//!
//! ## States
//!
//! ```text
//!            rollback(i) / restore(i)
//!   Idle ─────────────────────────────→ RolledBack { compensating }
//!    ↑                                      │  ↺ rollback(j): compensating overwritten
//!    └──────────────── undo() ──────────────┘
//! ```
//!
//! Only one level of undo exists. A second rollback before an undo replaces
//! the compensating copy, so `undo()` returns to the text present just before
//! the second rollback, not the first. `undo()` while idle does nothing.

use crate::document::EditableDocument;
use crate::errors::EditorError;
use crate::snapshots::{SnapshotIndex, SnapshotStore};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RollbackState {
    #[default]
    Idle,
    RolledBack {
        /// Document text saved by the last rollback or restore
        compensating: String,
    },
}

#[derive(Debug, Default)]
pub struct RollbackController {
    state: RollbackState,
}

impl RollbackController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the document with snapshot `target`, keeping the current text for undo
    pub fn rollback<D>(
        &mut self,
        target: SnapshotIndex,
        snapshots: &SnapshotStore,
        document: &mut D,
    ) -> Result<(), EditorError>
    where
        D: EditableDocument + ?Sized,
    {
        let text = snapshots.get(target)?;
        let compensating = document.text();
        document.replace_all(text);
        self.state = RollbackState::RolledBack { compensating };
        tracing::info!(snapshot = target.0, "document rolled back");
        Ok(())
    }

    /// Same as [`rollback`](Self::rollback); picked from the version list
    /// rather than from a transcript entry
    pub fn restore<D>(
        &mut self,
        target: SnapshotIndex,
        snapshots: &SnapshotStore,
        document: &mut D,
    ) -> Result<(), EditorError>
    where
        D: EditableDocument + ?Sized,
    {
        self.rollback(target, snapshots, document)
    }

    /// Put back the text saved by the last rollback.
    ///
    /// Returns `false` (and leaves the document alone) when idle.
    pub fn undo<D>(&mut self, document: &mut D) -> bool
    where
        D: EditableDocument + ?Sized,
    {
        match std::mem::take(&mut self.state) {
            RollbackState::RolledBack { compensating } => {
                document.replace_all(&compensating);
                tracing::info!("rollback undone");
                true
            }
            RollbackState::Idle => false,
        }
    }

    pub fn state(&self) -> &RollbackState {
        &self.state
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.state, RollbackState::RolledBack { .. })
    }

    pub fn compensating(&self) -> Option<&str> {
        match &self.state {
            RollbackState::RolledBack { compensating } => Some(compensating),
            RollbackState::Idle => None,
        }
    }
}
