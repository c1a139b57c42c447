//! # Document Persistence
//!
//! Where the document text lives between sessions. The session loads once when
//! it is created and saves after every committed mutation.

use std::path::{Path, PathBuf};

use crate::errors::EditorError;

pub trait DocumentStore {
    /// Previously saved text, `None` when nothing was saved yet
    fn load(&self) -> Result<Option<String>, EditorError>;

    fn save(&mut self, text: &str) -> Result<(), EditorError>;
}

/// Plain text file on disk
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentStore for FileStore {
    fn load(&self) -> Result<Option<String>, EditorError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&mut self, text: &str) -> Result<(), EditorError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

/// In-memory store that remembers every save
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Option<String>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            saved: Some(text.into()),
            saves: 0,
        }
    }

    pub fn saved(&self) -> Option<&str> {
        self.saved.as_deref()
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self) -> Result<Option<String>, EditorError> {
        Ok(self.saved.clone())
    }

    fn save(&mut self, text: &str) -> Result<(), EditorError> {
        self.saved = Some(text.to_string());
        self.saves += 1;
        Ok(())
    }
}
