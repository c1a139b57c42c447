//! # Transcript Log
//!
//! Append-only record of the conversation that runs alongside the document:
//! the user's request, the assistant's intent line, and the streamed content.
//!
//! Entries are addressed by the [`EntryHandle`] returned when they are appended.
//! Only an open assistant-content entry can grow, and only through its handle,
//! so a late delta can never land in an unrelated entry.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::InvalidHandle;
use crate::snapshots::SnapshotIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Request,
    Intent,
    Content,
}

/// Opaque position of an entry in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryHandle(usize);

impl EntryHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub kind: EntryKind,
    text: String,
    pub created_at: DateTime<Utc>,

    /// Snapshot captured when this content entry closed
    snapshot: Option<SnapshotIndex>,

    /// Still accepting deltas
    open: bool,
}

impl TranscriptEntry {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn snapshot(&self) -> Option<SnapshotIndex> {
        self.snapshot
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_content(&self) -> bool {
        self.role == Role::Assistant && self.kind == EntryKind::Content
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct TranscriptLog {
    entries: Vec<TranscriptEntry>,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    ///
    /// Assistant content entries start open; everything else is final.
    pub fn append_entry(
        &mut self,
        role: Role,
        kind: EntryKind,
        text: impl Into<String>,
    ) -> EntryHandle {
        let handle = EntryHandle(self.entries.len());
        self.entries.push(TranscriptEntry {
            role,
            kind,
            text: text.into(),
            created_at: Utc::now(),
            snapshot: None,
            open: role == Role::Assistant && kind == EntryKind::Content,
        });
        handle
    }

    /// Grow an open content entry
    pub fn append_delta(&mut self, handle: EntryHandle, delta: &str) -> Result<(), InvalidHandle> {
        let entry = self.open_entry_mut(handle)?;
        entry.text.push_str(delta);
        Ok(())
    }

    /// Mark a content entry as complete; later deltas are rejected
    pub fn close(&mut self, handle: EntryHandle) -> Result<(), InvalidHandle> {
        let entry = self.open_entry_mut(handle)?;
        entry.open = false;
        Ok(())
    }

    /// Record which snapshot belongs to a content entry. Written once.
    pub fn attach_snapshot(
        &mut self,
        handle: EntryHandle,
        index: SnapshotIndex,
    ) -> Result<(), InvalidHandle> {
        let entry = self
            .entries
            .get_mut(handle.0)
            .ok_or(InvalidHandle::UnknownEntry(handle))?;
        if !entry.is_content() {
            return Err(InvalidHandle::NotContent(handle));
        }
        if entry.snapshot.is_some() {
            return Err(InvalidHandle::SnapshotAttached(handle));
        }
        entry.snapshot = Some(index);
        Ok(())
    }

    pub fn get(&self, handle: EntryHandle) -> Option<&TranscriptEntry> {
        self.entries.get(handle.0)
    }

    /// Snapshot owned by a content entry
    pub fn snapshot_of(&self, handle: EntryHandle) -> Result<SnapshotIndex, InvalidHandle> {
        let entry = self.get(handle).ok_or(InvalidHandle::UnknownEntry(handle))?;
        if !entry.is_content() {
            return Err(InvalidHandle::NotContent(handle));
        }
        entry.snapshot.ok_or(InvalidHandle::NoSnapshot(handle))
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntryHandle, &TranscriptEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (EntryHandle(idx), entry))
    }

    /// Assistant content entries, in log order
    pub fn content_entries(&self) -> impl Iterator<Item = (EntryHandle, &TranscriptEntry)> {
        self.iter().filter(|(_, entry)| entry.is_content())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn open_entry_mut(
        &mut self,
        handle: EntryHandle,
    ) -> Result<&mut TranscriptEntry, InvalidHandle> {
        let entry = self
            .entries
            .get_mut(handle.0)
            .ok_or(InvalidHandle::UnknownEntry(handle))?;
        if !entry.is_content() {
            return Err(InvalidHandle::NotContent(handle));
        }
        if !entry.open {
            return Err(InvalidHandle::ClosedEntry(handle));
        }
        Ok(entry)
    }
}
