//! Host-supplied configuration for the core.
//!
//! # Invariants
//! - Every field has a default; an empty document is a valid config.
//! - A missing `db_path` means an in-memory store.

use crate::logging::{default_log_level, init_logging};
use crate::store::{PersistenceResult, SqliteIssueStore};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    /// SQLite file backing the store.
    pub db_path: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            db_path: None,
        }
    }
}

impl CoreConfig {
    /// Starts file logging when `log_dir` is set; a no-op otherwise.
    pub fn init_logging(&self) -> Result<(), String> {
        let Some(log_dir) = &self.log_dir else {
            return Ok(());
        };
        let log_dir = log_dir
            .to_str()
            .ok_or_else(|| format!("log_dir is not valid UTF-8: `{}`", log_dir.display()))?;
        init_logging(&self.log_level, log_dir)
    }

    /// Opens the configured store.
    pub fn open_store(&self) -> PersistenceResult<SqliteIssueStore> {
        match &self.db_path {
            Some(path) => SqliteIssueStore::open(path),
            None => SqliteIssueStore::open_in_memory(),
        }
    }
}
