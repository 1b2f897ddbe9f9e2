pub mod file;
pub mod key;
pub mod keys;

use file::{OverrideFile, Overrides};
use std::{path::Path, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub use file::StoreError;
pub use key::{Key, Value, ValueKind};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("key {key} expects a {expected} value, got {actual}")]
    KindMismatch {
        key: String,
        expected: ValueKind,
        actual: ValueKind,
    },
    #[error("cannot read {value:?} as a {expected} value for {key}")]
    Parse {
        key: String,
        expected: ValueKind,
        value: String,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug)]
struct RegistryInner {
    overrides: RwLock<Overrides>,
    file: Option<OverrideFile>,
}

/// Key/value configuration store with default-value fallback. Clones share
/// the same overrides.
#[derive(Clone, Debug)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    /// Loads overrides from `path`; every later change is written back.
    pub async fn open(path: impl AsRef<Path>) -> Self {
        let file = OverrideFile::new(path);
        let overrides = file.load().await;
        debug!(
            "Loaded {} registry overrides from {}",
            overrides.len(),
            file.path().display()
        );
        Self::with(overrides, Some(file))
    }

    pub fn in_memory() -> Self {
        Self::with(Overrides::new(), None)
    }

    fn with(overrides: Overrides, file: Option<OverrideFile>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                overrides: RwLock::new(overrides),
                file,
            }),
        }
    }

    pub async fn get_or_default(&self, key: &Key) -> Value {
        let overrides = self.inner.overrides.read().await;
        match overrides.get(key.name()) {
            Some(value) if value.kind() == key.kind() => value.clone(),
            Some(value) => {
                warn!(
                    "Ignoring {} override for {} key {}",
                    value.kind(),
                    key.kind(),
                    key.name()
                );
                key.default_value().clone()
            }
            None => key.default_value().clone(),
        }
    }

    pub async fn set(&self, key: &Key, value: Value) -> Result<(), RegistryError> {
        if value.kind() != key.kind() {
            return Err(RegistryError::KindMismatch {
                key: key.name().to_string(),
                expected: key.kind(),
                actual: value.kind(),
            });
        }

        debug!("Setting registry key {}", key.name());
        self.update(|overrides| {
            overrides.insert(key.name().to_string(), value);
        })
        .await
    }

    pub async fn unset(&self, key: &Key) -> Result<(), RegistryError> {
        self.update(|overrides| {
            overrides.remove(key.name());
        })
        .await
    }

    // The write lock is held across the save so files land in commit order.
    async fn update(&self, f: impl FnOnce(&mut Overrides)) -> Result<(), RegistryError> {
        let mut overrides = self.inner.overrides.write().await;
        let mut next = overrides.clone();
        f(&mut next);
        if let Some(file) = &self.inner.file {
            file.save(&next).await?;
        }
        *overrides = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn falls_back_to_default() {
        let registry = Registry::in_memory();
        let key = Key::new("SERVER_NAME", "server");
        assert_eq!(registry.get_or_default(&key).await, Value::from("server"));
    }

    #[tokio::test]
    async fn override_wins_until_unset() {
        let registry = Registry::in_memory();
        let key = Key::new("SERVER_NAME", "server");

        registry.set(&key, "lobby".into()).await.unwrap();
        assert_eq!(registry.get_or_default(&key).await, Value::from("lobby"));

        registry.unset(&key).await.unwrap();
        assert_eq!(registry.get_or_default(&key).await, Value::from("server"));
    }

    #[tokio::test]
    async fn clones_share_overrides() {
        let registry = Registry::in_memory();
        let key = Key::new("SERVER_NAME", "server");

        registry.clone().set(&key, "lobby".into()).await.unwrap();
        assert_eq!(registry.get_or_default(&key).await, Value::from("lobby"));
    }

    #[tokio::test]
    async fn rejects_wrong_kind() {
        let registry = Registry::in_memory();
        let key = Key::new("MONGODB_PORT", 27017_i64);

        let err = registry.set(&key, "not a port".into()).await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::KindMismatch {
                expected: ValueKind::Int,
                actual: ValueKind::Text,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn overrides_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.db");
        let key = Key::new("MONGODB_PORT", 27017_i64);

        Registry::open(&path)
            .await
            .set(&key, Value::Int(27018))
            .await
            .unwrap();

        let reopened = Registry::open(&path).await;
        assert_eq!(reopened.get_or_default(&key).await, Value::Int(27018));
    }

    #[tokio::test]
    async fn failed_save_keeps_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail.
        let path = dir.path().join("registry.db");
        std::fs::create_dir_all(path.join("occupied")).unwrap();
        let registry = Registry::open(&path).await;
        let key = Key::new("SERVER_NAME", "server");

        assert!(registry.set(&key, "lobby".into()).await.is_err());
        assert_eq!(registry.get_or_default(&key).await, Value::from("server"));
    }
}
