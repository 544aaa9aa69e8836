//! Append-only journal sinks.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::journal::entry::LogEntry;

/// The sink could not take an entry.
#[derive(Debug, Error)]
pub enum LogSinkUnavailable {
    #[error("log sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("log sink did not accept the entry within {0:?}")]
    Timeout(Duration),
}

/// Destination for journal entries.
///
/// Implementations must make each `append` atomic with respect to other
/// appends: concurrent entries may interleave, their bytes may not.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn append(&self, entry: &LogEntry) -> Result<(), LogSinkUnavailable>;
}

/// Plain-text journal file, opened in append mode for each entry.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LogSink for FileSink {
    async fn append(&self, entry: &LogEntry) -> Result<(), LogSinkUnavailable> {
        let line = entry.to_line();

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Keeps formatted lines in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines appended so far, newline included.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl LogSink for MemorySink {
    async fn append(&self, entry: &LogEntry) -> Result<(), LogSinkUnavailable> {
        let line = entry.to_line();
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
        Ok(())
    }
}
