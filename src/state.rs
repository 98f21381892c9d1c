//! Durable delivery watermark.
//!
//! The watermark is the id of the last successfully delivered post. It is the
//! only durable state in the process: everything else is rebuilt from the
//! feed each poll cycle. Single writer (the synchronizer), so no locking.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigFile;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Owns the persisted config record and the watermark cursor inside it.
///
/// `advance` rewrites the whole record so the cursor survives restarts.
/// Last-writer-wins: a partially written file is repaired by the next
/// successful advance, and an unparseable file loads as watermark 0.
#[derive(Debug)]
pub struct WatermarkStore {
    path: PathBuf,
    record: ConfigFile,
}

impl WatermarkStore {
    #[must_use]
    pub fn new(path: PathBuf, record: ConfigFile) -> Self {
        Self { path, record }
    }

    /// The current watermark: posts with ids at or below this are delivered.
    #[must_use]
    pub fn current(&self) -> i64 {
        self.record.last_post_id
    }

    /// Advance the watermark to `new` and persist the record.
    ///
    /// The in-memory cursor moves even when the write fails, so a post is
    /// never re-sent within the same process lifetime; the caller must log
    /// the error loudly, because a stale file means duplicate re-delivery
    /// after a restart. Values at or below the current watermark are ignored
    /// (the cursor is monotonically non-decreasing).
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or written.
    pub async fn advance(&mut self, new: i64) -> Result<(), PersistenceError> {
        if new <= self.record.last_post_id {
            return Ok(());
        }
        self.record.last_post_id = new;
        let json = serde_json::to_string_pretty(&self.record)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| PersistenceError::Write {
                path: self.path.clone(),
                source,
            })
    }
}
