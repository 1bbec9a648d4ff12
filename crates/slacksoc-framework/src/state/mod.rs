//! Debounced, persisted plugin state.
//!
//! Plugins keep one opaque JSON blob each, keyed by plugin instance name. The
//! [`StateStore`] handle is cheap to clone and is shared by every handler:
//!
//! - reads ([`get`](StateStore::get)) come from a synchronized snapshot and
//!   see every update made so far, even before it reaches storage;
//! - writes ([`update`](StateStore::update)) update that snapshot and enqueue
//!   a request for the state actor.
//!
//! The actor runs on its own task. The first update after a flush arms a
//! single timer; updates arriving before it fires are coalesced into the same
//! write. A failed write is logged and retried one delay later.
//!
//! ```text
//!            update                      delay elapsed
//!   Clean ───────────▶ Dirty{flush_at} ────────────────▶ save ──ok──▶ Clean
//!                        ▲   │ update (no new timer)        │
//!                        └───┘                              └─err─▶ Dirty{now + delay}
//! ```

mod actor;
mod backend;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use actor::{StateActor, StateRequest};

pub use backend::{JsonFileBackend, MemoryBackend, StateBackend};

/// Plugin instance name to state blob.
pub type StateTable = BTreeMap<String, Value>;

/// Errors raised by the state store and its backends.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("state I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode state: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("state of '{plugin}' has an unexpected shape: {source}")]
    Decode {
        plugin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("state actor has stopped")]
    Closed,
}

impl StateError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Handle to the persisted state table.
#[derive(Clone)]
pub struct StateStore {
    snapshot: Arc<RwLock<StateTable>>,
    tx: mpsc::UnboundedSender<StateRequest>,
}

impl StateStore {
    /// Loads the table from `backend` and spawns the state actor.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn open(backend: Arc<dyn StateBackend>, delay: Duration) -> Result<Self, StateError> {
        let table = backend.load().await?;
        tracing::info!(entries = table.len(), delay = ?delay, "State loaded");

        let (tx, rx) = mpsc::unbounded_channel();
        let snapshot = Arc::new(RwLock::new(table.clone()));
        tokio::spawn(StateActor::new(table, backend, delay, rx).run());

        Ok(Self { snapshot, tx })
    }

    /// Returns the current blob of `plugin`.
    pub fn get(&self, plugin: &str) -> Option<Value> {
        self.snapshot.read().get(plugin).cloned()
    }

    /// Returns the current blob of `plugin`, decoded as `T`.
    pub fn get_as<T: DeserializeOwned>(&self, plugin: &str) -> Result<Option<T>, StateError> {
        self.get(plugin)
            .map(|value| {
                serde_json::from_value(value).map_err(|source| StateError::Decode {
                    plugin: plugin.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// Replaces the blob of `plugin`.
    ///
    /// The new value is visible to [`get`](Self::get) immediately and will be
    /// written to storage once the debounce window elapses. After shutdown the
    /// update is refused and reads keep the last accepted value.
    pub fn update(&self, plugin: &str, value: Value) -> Result<(), StateError> {
        // Held across the send so the actor sees updates in snapshot order.
        let mut snapshot = self.snapshot.write();
        self.tx
            .send(StateRequest::Update {
                plugin: plugin.to_string(),
                value: value.clone(),
            })
            .map_err(|_| StateError::Closed)?;
        snapshot.insert(plugin.to_string(), value);
        Ok(())
    }

    /// Serializes `state` and stores it as the blob of `plugin`.
    pub fn update_from<T: Serialize + ?Sized>(
        &self,
        plugin: &str,
        state: &T,
    ) -> Result<(), StateError> {
        let value = serde_json::to_value(state).map_err(StateError::Encode)?;
        self.update(plugin, value)
    }

    /// Writes pending changes now instead of waiting for the timer.
    pub async fn flush(&self) -> Result<(), StateError> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(StateRequest::Flush { ack })
            .map_err(|_| StateError::Closed)?;
        done.await.map_err(|_| StateError::Closed)?
    }

    /// Flushes pending changes and stops the actor.
    ///
    /// Further updates fail with [`StateError::Closed`].
    pub async fn shutdown(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(StateRequest::Shutdown { ack }).is_ok() {
            let _ = done.await;
        }
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("entries", &self.snapshot.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use tokio::time::sleep;

    const DELAY: Duration = Duration::from_secs(5);

    async fn open(backend: &Arc<MemoryBackend>) -> StateStore {
        StateStore::open(backend.clone(), DELAY).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_sees_update_immediately() {
        let backend = Arc::new(MemoryBackend::new());
        let store = open(&backend).await;

        store.update("counter", json!(1)).unwrap();
        assert_eq!(store.get("counter"), Some(json!(1)));
        assert!(store.get("other").is_none());
        assert!(backend.saves().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_coalesced_into_one_flush() {
        let backend = Arc::new(MemoryBackend::new());
        let store = open(&backend).await;

        for i in 0..10 {
            store.update("counter", json!(i)).unwrap();
            sleep(Duration::from_millis(100)).await;
        }
        assert!(backend.saves().is_empty());

        sleep(DELAY).await;
        let saves = backend.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0]["counter"], json!(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_is_not_earlier_than_delay() {
        let backend = Arc::new(MemoryBackend::new());
        let store = open(&backend).await;

        store.update("a", json!(true)).unwrap();
        sleep(DELAY - Duration::from_millis(10)).await;
        assert!(backend.saves().is_empty());
        sleep(Duration::from_millis(20)).await;
        assert_eq!(backend.saves().len(), 1);

        // A new window opens after the flush.
        store.update("a", json!(false)).unwrap();
        sleep(DELAY + Duration::from_millis(10)).await;
        assert_eq!(backend.saves().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_flush_is_retried() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail_next(1);
        let store = open(&backend).await;

        store.update("a", json!(1)).unwrap();
        sleep(DELAY + Duration::from_millis(10)).await;
        assert!(backend.saves().is_empty());

        sleep(DELAY).await;
        assert_eq!(backend.last_save().unwrap()["a"], json!(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes_pending_updates() {
        let backend = Arc::new(MemoryBackend::new());
        let store = open(&backend).await;

        store.update("a", json!("pending")).unwrap();
        store.shutdown().await;
        assert_eq!(backend.saves().len(), 1);
        assert!(matches!(
            store.update("a", json!("late")),
            Err(StateError::Closed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_update_is_not_visible() {
        let backend = Arc::new(MemoryBackend::new());
        let store = open(&backend).await;

        store.update("a", json!(1)).unwrap();
        store.shutdown().await;
        assert!(store.update("a", json!("late")).is_err());
        assert!(store.update_from("b", &json!(2)).is_err());

        assert_eq!(store.get("a"), Some(json!(1)));
        assert!(store.get("b").is_none());
        assert_eq!(backend.last_save().unwrap()["a"], json!(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_flush() {
        let backend = Arc::new(MemoryBackend::new());
        let store = open(&backend).await;

        store.flush().await.unwrap();
        assert!(backend.saves().is_empty());

        store.update("a", json!(1)).unwrap();
        store.flush().await.unwrap();
        assert_eq!(backend.saves().len(), 1);
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Game {
        unique: u32,
    }

    #[tokio::test(start_paused = true)]
    async fn test_typed_access_and_initial_table() {
        let mut initial = StateTable::new();
        initial.insert("game".into(), json!({"unique": 2}));
        let backend = Arc::new(MemoryBackend::with_table(initial));
        let store = open(&backend).await;

        assert_eq!(store.get_as::<Game>("game").unwrap(), Some(Game { unique: 2 }));
        store.update_from("game", &Game { unique: 3 }).unwrap();
        assert_eq!(store.get_as::<Game>("game").unwrap(), Some(Game { unique: 3 }));

        store.update("game", json!("nope")).unwrap();
        assert!(matches!(
            store.get_as::<Game>("game"),
            Err(StateError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn test_restart_reproduces_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = StateStore::open(Arc::new(JsonFileBackend::new(&path)), DELAY)
            .await
            .unwrap();
        store.update("x", json!({"k": [1, 2]})).unwrap();
        store.update("y", json!("v")).unwrap();
        store.shutdown().await;

        let reopened = StateStore::open(Arc::new(JsonFileBackend::new(&path)), DELAY)
            .await
            .unwrap();
        assert_eq!(reopened.get("x"), Some(json!({"k": [1, 2]})));
        assert_eq!(reopened.get("y"), Some(json!("v")));
        reopened.shutdown().await;
    }
}
