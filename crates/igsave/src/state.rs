//! "Current download" state shown by the extension popup
//!
//! The state lives in memory behind a lock owned by the server. When a state
//! file is configured it is written at checkpoints only: when a download
//! begins, when it finishes and when the extension clears it.

use igcore::{AppResult, ExtractionResult, MediaCandidate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Snapshot of the most recent download
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadState {
    pub is_processing: bool,
    pub url: Option<String>,
    #[serde(default)]
    pub media: Vec<MediaCandidate>,
    pub username: Option<String>,
    pub error: Option<String>,
}

impl DownloadState {
    fn started(url: &str) -> Self {
        Self {
            is_processing: true,
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    fn finished(url: &str, result: &ExtractionResult) -> Self {
        Self {
            is_processing: false,
            url: Some(url.to_string()),
            media: result.media.clone(),
            username: result.username.clone(),
            error: result.error.clone(),
        }
    }
}

/// Shared, optionally file-backed [`DownloadState`]
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    inner: Arc<RwLock<DownloadState>>,
    path: Option<PathBuf>,
}

impl StateStore {
    /// In-memory store
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Store persisted to `path`; a previously saved state is restored when
    /// the file is readable, with `isProcessing` reset since no download
    /// survives a restart.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut initial = match read_state(&path).await {
            Ok(Some(state)) => {
                log::info!("Restored download state from {}", path.display());
                state
            }
            Ok(None) => DownloadState::default(),
            Err(e) => {
                log::warn!("Ignoring unreadable state file {}: {}", path.display(), e);
                DownloadState::default()
            }
        };
        initial.is_processing = false;

        Self {
            inner: Arc::new(RwLock::new(initial)),
            path: Some(path),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn snapshot(&self) -> DownloadState {
        self.inner.read().await.clone()
    }

    /// Checkpoint: a download for `url` started
    pub async fn begin(&self, url: &str) -> DownloadState {
        self.replace(DownloadState::started(url)).await
    }

    /// Checkpoint: the download for `url` produced `result`
    pub async fn finish(&self, url: &str, result: &ExtractionResult) -> DownloadState {
        self.replace(DownloadState::finished(url, result)).await
    }

    /// Checkpoint: the extension dismissed the last download
    pub async fn clear(&self) -> DownloadState {
        self.replace(DownloadState::default()).await
    }

    /// Memory and file are updated under the same write guard.
    async fn replace(&self, next: DownloadState) -> DownloadState {
        let mut guard = self.inner.write().await;
        *guard = next.clone();

        if let Some(path) = &self.path {
            if let Err(e) = write_state(path, &next).await {
                log::warn!("Failed to persist download state to {}: {}", path.display(), e);
            }
        }
        drop(guard);
        next
    }
}

async fn read_state(path: &Path) -> AppResult<Option<DownloadState>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write to a sibling temp file, then rename over `path`.
async fn write_state(path: &Path, state: &DownloadState) -> AppResult<()> {
    let bytes = serde_json::to_vec_pretty(state)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
