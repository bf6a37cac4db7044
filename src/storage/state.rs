//! Key/value state that survives between hook invocations.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::writer::{write_atomic, StorageError};

/// Errors from the state store.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Corrupt state file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("State serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("State store lock poisoned")]
    Poisoned,
}

/// String key/value store injected into the hook.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StateError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), StateError>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StateError> {
        let values = self.values.lock().map_err(|_| StateError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StateError> {
        let mut values = self.values.lock().map_err(|_| StateError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk, re-read on every access.
///
/// A missing file reads as empty. Writes replace the file atomically.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, StateError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|source| StateError::Corrupt {
                path: self.path.clone(),
                source,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(source) => Err(StateError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StateError> {
        Ok(self.load().await?.remove(key))
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StateError> {
        let mut values = self.load().await?;
        values.insert(key.to_string(), value.to_string());
        let json = serde_json::to_string_pretty(&values)?;
        write_atomic(&self.path, &json).await?;
        Ok(())
    }
}

/// State key for a project's cooldown timestamp.
#[must_use]
pub fn cooldown_key(project: &str) -> String {
    format!("cooldown:{project}")
}

/// Whether the project ran less than `cooldown_secs` before `now`.
///
/// Zero disables the cooldown. Unparseable timestamps count as expired.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub async fn in_cooldown(
    store: &dyn StateStore,
    key: &str,
    cooldown_secs: u64,
    now: DateTime<Utc>,
) -> Result<bool, StateError> {
    if cooldown_secs == 0 {
        return Ok(false);
    }

    let Some(last) = store.get(key).await? else {
        return Ok(false);
    };
    let Ok(last) = DateTime::parse_from_rfc3339(&last) else {
        tracing::warn!(key, value = %last, "Ignoring unparseable cooldown timestamp");
        return Ok(false);
    };

    let elapsed = now.signed_duration_since(last.with_timezone(&Utc));
    let window = i64::try_from(cooldown_secs).unwrap_or(i64::MAX);
    Ok(elapsed.num_seconds() < window)
}

/// Record that the project ran at `now`.
///
/// # Errors
///
/// Returns an error if the store cannot be written.
pub async fn record_run(
    store: &dyn StateStore,
    key: &str,
    now: DateTime<Utc>,
) -> Result<(), StateError> {
    store.put(key, &now.to_rfc3339()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.get("a").await.unwrap().is_none());
        store.put("a", "1").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_json_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/state.json");

        JsonFileStore::new(&path).put("k", "v").await.unwrap();
        JsonFileStore::new(&path).put("k2", "v2").await.unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(reopened.get("k2").await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_json_store_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();

        let err = JsonFileStore::new(&path).get("k").await.unwrap_err();
        assert!(matches!(err, StateError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_cooldown() {
        let store = MemoryStore::new();
        let key = cooldown_key("personal/app");
        let now = Utc::now();

        assert!(!in_cooldown(&store, &key, 60, now).await.unwrap());

        record_run(&store, &key, now).await.unwrap();
        assert!(in_cooldown(&store, &key, 60, now + Duration::seconds(30)).await.unwrap());
        assert!(!in_cooldown(&store, &key, 60, now + Duration::seconds(61)).await.unwrap());
        assert!(!in_cooldown(&store, &key, 0, now).await.unwrap());
    }

    #[tokio::test]
    async fn test_cooldown_ignores_garbage() {
        let store = MemoryStore::new();
        store.put("cooldown:x", "yesterday").await.unwrap();
        assert!(!in_cooldown(&store, "cooldown:x", 60, Utc::now()).await.unwrap());
    }
}
