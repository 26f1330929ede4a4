use crate::error::AppError;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Append-only miner log. The file is opened once and held until `close`.
pub struct MinerLog {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl MinerLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the file in append mode unless it is already open.
    pub async fn open(&self) -> Result<(), AppError> {
        let mut file = self.file.lock().await;
        if file.is_none() {
            let opened = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            tracing::debug!("Opened miner log {}", self.path.display());
            *file = Some(opened);
        }
        Ok(())
    }

    /// Writes one line plus a newline and flushes. A closed log drops the line.
    pub async fn append(&self, line: &str) -> Result<(), AppError> {
        let mut file = self.file.lock().await;
        if let Some(file) = file.as_mut() {
            file.write_all(line.as_bytes()).await?;
            file.write_all(b"\n").await?;
            file.flush().await?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        if let Some(mut file) = self.file.lock().await.take() {
            if let Err(e) = file.flush().await {
                tracing::warn!("Failed to flush miner log {}: {e}", self.path.display());
            }
        }
    }

    pub async fn is_open(&self) -> bool {
        self.file.lock().await.is_some()
    }
}
