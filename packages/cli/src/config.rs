use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "inkflow.config.json";

/// Inkflow configuration file format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Document the CLI edits, relative to the config directory
    #[serde(default = "default_document_path")]
    pub document_path: String,

    /// Bytes per chunk when replaying a recorded stream
    #[serde(default = "default_replay_chunk_size")]
    pub replay_chunk_size: usize,

    /// Tracing filter used when `RUST_LOG` is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

fn default_document_path() -> String {
    "document.txt".to_string()
}

fn default_replay_chunk_size() -> usize {
    64
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get absolute path to the edited document
    pub fn get_document_path(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.document_path)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            document_path: default_document_path(),
            replay_chunk_size: default_replay_chunk_size(),
            log_filter: None,
        }
    }
}
