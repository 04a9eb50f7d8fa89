use std::{
    fmt,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use thiserror::Error;
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};

pub const DEFAULT_AUDIT_LOG: &str = "exchange_history.log";

#[derive(Error, Debug)]
#[error("failed to append to audit log {path}: {source}")]
pub struct AuditError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// One line of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub sender: String,
    pub text: String,
}

impl LogEntry {
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            sender: sender.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.6f"),
            self.sender,
            self.text
        )
    }
}

/// Append-only audit file. Writers take turns so lines never interleave,
/// and the file is reopened for every entry.
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    writer: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, entry: &LogEntry) -> Result<(), AuditError> {
        let _turn = self.writer.lock().await;
        self.write_line(&format!("{entry}\n"))
            .await
            .map_err(|source| AuditError {
                path: self.path.clone(),
                source,
            })
    }

    async fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}
