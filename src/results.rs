//! Append-only JSON result log
//!
//! One run writes one pretty-printed JSON array of [`ItemResult`] records.
//! Appends are read-modify-write cycles serialized by an async mutex, and
//! the rewrite lands via a temp file + atomic rename, so the file is a
//! syntactically valid JSON array at every observation point after
//! [`ResultLog::init`].

use crate::error::{Error, Result};
use crate::types::ItemResult;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Shared, mutex-guarded sink for per-item results
///
/// All workers funnel their records through the orchestrator's single append
/// path; the internal lock additionally protects the log when it is shared
/// directly.
#[derive(Debug)]
pub struct ResultLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ResultLog {
    /// Create a log handle for `path`; nothing is written until [`init`]
    ///
    /// [`init`]: ResultLog::init
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncate the log to an empty JSON array
    ///
    /// Called once at run start; existing content from earlier runs is
    /// discarded.
    pub async fn init(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        write_atomic(&self.path, b"[]").await
    }

    /// Append one record to the array on disk
    ///
    /// On failure the record is additionally persisted to a distinct
    /// timestamped backup file next to the log before the error is returned,
    /// so a record is only ever lost if the backup write fails too.
    pub async fn append(&self, record: &ItemResult) -> Result<()> {
        let _guard = self.lock.lock().await;

        match self.append_locked(record).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!(error = %e, id = record.id, "Failed to update result log");
                self.write_backup(record).await;
                Err(e)
            }
        }
    }

    /// Read the full array back from disk
    pub async fn read_all(&self) -> Result<Vec<ItemResult>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn append_locked(&self, record: &ItemResult) -> Result<()> {
        let mut records = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => match serde_json::from_str::<Vec<ItemResult>>(&content) {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        path = %self.path.display(),
                        "Existing result log is invalid, starting fresh"
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(Error::Io(e)),
        };

        records.push(record.clone());
        let bytes = serde_json::to_vec_pretty(&records)?;
        write_atomic(&self.path, &bytes).await
    }

    /// Persist a single record to `{stem}_backup_{id}_{timestamp}.json`
    async fn write_backup(&self, record: &ItemResult) {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("results");
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let backup_name = format!("{stem}_backup_{}_{timestamp}.json", record.id);
        let backup_path = match self.path.parent() {
            Some(parent) => parent.join(backup_name),
            None => PathBuf::from(backup_name),
        };

        let payload = match serde_json::to_vec_pretty(&vec![record]) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize backup record");
                return;
            }
        };

        match tokio::fs::write(&backup_path, payload).await {
            Ok(()) => {
                tracing::info!(path = %backup_path.display(), "Saved record to backup file");
            }
            Err(e) => {
                tracing::error!(error = %e, path = %backup_path.display(), "Failed to save backup");
            }
        }
    }
}

/// Build a timestamped results path like `{base}_20240131_094500.json`
///
/// Mirrors the log-per-run convention: callers that want a fresh result file
/// per invocation derive it from a fixed base name.
pub fn timestamped_results_path(base: &str) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("{base}_{timestamp}.json"))
}

/// Write a whole file through a temp sibling + rename
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
