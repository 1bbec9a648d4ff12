//! Durable storage for the state table.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{StateError, StateTable};

/// Where the state table is loaded from and saved to.
///
/// `save` always receives the complete table.
#[async_trait]
pub trait StateBackend: Send + Sync + 'static {
    /// Loads the persisted table. A backend with nothing stored yet returns an
    /// empty table.
    async fn load(&self) -> Result<StateTable, StateError>;

    async fn save(&self, table: &StateTable) -> Result<(), StateError>;
}

/// Stores the table as one pretty-printed JSON object.
///
/// Saves go to a sibling temporary file which is synced to disk and then
/// renamed over the target, so a crash mid-write leaves the previous snapshot
/// intact.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StateBackend for JsonFileBackend {
    async fn load(&self) -> Result<StateTable, StateError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No state file, starting empty");
                return Ok(StateTable::new());
            }
            Err(e) => return Err(StateError::io(&self.path, e)),
        };
        serde_json::from_slice(&raw).map_err(|source| StateError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn save(&self, table: &StateTable) -> Result<(), StateError> {
        let encoded = serde_json::to_vec_pretty(table).map_err(StateError::Encode)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StateError::io(parent, e))?;
        }

        let temp = self.temp_path();
        {
            let mut file = tokio::fs::File::create(&temp)
                .await
                .map_err(|e| StateError::io(&temp, e))?;
            file.write_all(&encoded)
                .await
                .map_err(|e| StateError::io(&temp, e))?;
            file.sync_all()
                .await
                .map_err(|e| StateError::io(&temp, e))?;
        }
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| StateError::io(&self.path, e))
    }
}

/// Keeps snapshots in memory. Useful in tests and for bots that do not need
/// persistence.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    initial: StateTable,
    saves: Mutex<Vec<StateTable>>,
    failures: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing table, as if it had been persisted earlier.
    pub fn with_table(initial: StateTable) -> Self {
        Self {
            initial,
            ..Self::default()
        }
    }

    /// Makes the next `count` saves fail.
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Every successfully saved snapshot, oldest first.
    pub fn saves(&self) -> Vec<StateTable> {
        self.saves.lock().clone()
    }

    pub fn last_save(&self) -> Option<StateTable> {
        self.saves.lock().last().cloned()
    }
}

#[async_trait]
impl StateBackend for MemoryBackend {
    async fn load(&self) -> Result<StateTable, StateError> {
        Ok(self.initial.clone())
    }

    async fn save(&self, table: &StateTable) -> Result<(), StateError> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StateError::io(
                "memory",
                std::io::Error::other("simulated save failure"),
            ));
        }
        self.saves.lock().push(table.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("state.json"));
        assert!(backend.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_reproduces_table() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("nested/state.json"));

        let mut table = StateTable::new();
        table.insert("potato".into(), json!({"history": [], "unique": 0}));
        table.insert("counter".into(), json!(3));
        backend.save(&table).await.unwrap();

        let reopened = JsonFileBackend::new(backend.path());
        assert_eq!(reopened.load().await.unwrap(), table);
        assert!(!backend.temp_path().exists());
    }

    #[tokio::test]
    async fn test_save_replaces_stale_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("state.json"));
        std::fs::write(backend.temp_path(), b"{\"half\": ").unwrap();

        let mut table = StateTable::new();
        table.insert("counter".into(), json!(1));
        backend.save(&table).await.unwrap();
        table.insert("counter".into(), json!(2));
        backend.save(&table).await.unwrap();

        assert_eq!(backend.load().await.unwrap(), table);
        assert!(!backend.temp_path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{not json").unwrap();
        let err = JsonFileBackend::new(&path).load().await.unwrap_err();
        assert!(matches!(err, StateError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_memory_backend_failures() {
        let backend = MemoryBackend::new();
        backend.fail_next(1);
        assert!(backend.save(&StateTable::new()).await.is_err());
        assert!(backend.save(&StateTable::new()).await.is_ok());
        assert_eq!(backend.saves().len(), 1);
    }
}
