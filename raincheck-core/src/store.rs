//! Persistence for the selected city.
//!
//! A store holds zero or one [`WeatherRecord`]. Saving replaces whatever was
//! there; there is no history.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::{io::AsyncWriteExt, sync::Mutex as AsyncMutex};

use crate::model::WeatherRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("stored selection is malformed: {0}")]
    Schema(#[from] serde_json::Error),
}

#[async_trait]
pub trait SelectionStore: Send + Sync + std::fmt::Debug {
    async fn get_selected(&self) -> Result<Option<WeatherRecord>, StoreError>;

    /// Replace the stored record. On error the previous record stays in place.
    async fn save(&self, record: &WeatherRecord) -> Result<(), StoreError>;
}

/// Keeps the selection in a single JSON file.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so readers only ever observe a complete record.
#[derive(Debug)]
pub struct FileSelectionStore {
    path: PathBuf,
    write_lock: AsyncMutex<()>,
}

impl FileSelectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: AsyncMutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(path: &Path, source: io::Error) -> StoreError {
        StoreError::Io { path: path.to_path_buf(), source }
    }
}

#[async_trait]
impl SelectionStore for FileSelectionStore {
    async fn get_selected(&self) -> Result<Option<WeatherRecord>, StoreError> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_error(&self.path, e)),
        };

        Ok(Some(serde_json::from_slice(&contents)?))
    }

    async fn save(&self, record: &WeatherRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| Self::io_error(parent, e))?;
        }

        let json = serde_json::to_vec_pretty(record)?;
        let tmp = self.tmp_path();

        write_synced(&tmp, &json).await.map_err(|e| Self::io_error(&tmp, e))?;

        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Self::io_error(&self.path, e));
        }

        tracing::debug!(path = %self.path.display(), city = record.name(), "selection written");
        Ok(())
    }
}

/// Write `contents` and flush them to disk before the caller renames the file.
async fn write_synced(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await
}

/// Non-durable store, for previews and tests.
#[derive(Debug, Default)]
pub struct MemorySelectionStore {
    slot: Mutex<Option<WeatherRecord>>,
}

impl MemorySelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selection(record: WeatherRecord) -> Self {
        Self { slot: Mutex::new(Some(record)) }
    }
}

#[async_trait]
impl SelectionStore for MemorySelectionStore {
    async fn get_selected(&self) -> Result<Option<WeatherRecord>, StoreError> {
        Ok(self.slot.lock().clone())
    }

    async fn save(&self, record: &WeatherRecord) -> Result<(), StoreError> {
        *self.slot.lock() = Some(record.clone());
        Ok(())
    }
}
