//! # Snapshot Store
//!
//! Full-document captures, one per finished AI action that changed the
//! document. Append-only; the owning transcript entry records the index.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::EditorError;

/// Position of a snapshot in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SnapshotIndex(pub usize);

impl fmt::Display for SnapshotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub text: String,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct SnapshotStore {
    snapshots: Vec<Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(&mut self, text: impl Into<String>) -> SnapshotIndex {
        let index = SnapshotIndex(self.snapshots.len());
        self.snapshots.push(Snapshot {
            text: text.into(),
            captured_at: Utc::now(),
        });
        tracing::debug!(index = index.0, "captured snapshot");
        index
    }

    pub fn get(&self, index: SnapshotIndex) -> Result<&str, EditorError> {
        self.snapshots
            .get(index.0)
            .map(|snapshot| snapshot.text.as_str())
            .ok_or(EditorError::IndexOutOfRange {
                index,
                len: self.snapshots.len(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (SnapshotIndex, &Snapshot)> {
        self.snapshots
            .iter()
            .enumerate()
            .map(|(idx, snapshot)| (SnapshotIndex(idx), snapshot))
    }

    pub fn latest(&self) -> Option<SnapshotIndex> {
        self.snapshots.len().checked_sub(1).map(SnapshotIndex)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
