//! Append-only JSON Lines file sink
//!
//! Writes one serialized event per line. The parent directory is created
//! and the file opened on first delivery; the handle is reused afterwards.

use crate::error::{AuditError, Result};
use crate::event::AuditEvent;
use crate::sink::AuditSink;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// JSON Lines file sink
///
/// Each event is written with a single `write_all` under an async mutex, so
/// lines from concurrent deliveries never interleave.
pub struct FileSink {
    path: PathBuf,
    file: Mutex<Option<fs::File>>,
}

impl FileSink {
    /// Create a new file sink at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every event in the file
    pub async fn read_all(&self) -> Result<Vec<AuditEvent>> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            AuditError::Sink(format!(
                "Failed to read audit file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(AuditError::from))
            .collect()
    }

    async fn open(&self) -> Result<fs::File> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AuditError::Config(format!(
                    "Failed to create audit directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                AuditError::Sink(format!(
                    "Failed to open audit file {}: {}",
                    self.path.display(),
                    e
                ))
            })
    }

    async fn append(&self, line: &[u8]) -> Result<()> {
        let mut guard = self.file.lock().await;

        let mut file = match guard.take() {
            Some(file) => file,
            None => self.open().await?,
        };

        let written = match file.write_all(line).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };

        // A failed handle is dropped so the next delivery reopens the file
        written.map_err(|e| {
            AuditError::Sink(format!(
                "Failed to write audit file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        *guard = Some(file);
        Ok(())
    }
}

#[async_trait]
impl AuditSink for FileSink {
    async fn deliver(&self, event: &AuditEvent) -> Result<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        self.append(&line).await?;

        tracing::debug!(
            path = %self.path.display(),
            trace_id = %event.trace_id,
            "Audit event written"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}
