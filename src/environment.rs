use crate::registry::{keys, Key, Registry, Value};
use serde::{Deserialize, Serialize};
use std::{path::Path, sync::Arc};
use thiserror::Error;
use tokio::{fs, sync::RwLock};
use tracing::info;

pub const CORE_ENVIRONMENT: &str = "anvil";

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("environment {0} is already registered")]
    Duplicate(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid environment file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("key {key} has an unusable default {value}")]
    InvalidDefault {
        key: String,
        value: serde_json::Value,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginInfo {
    pub version: String,
    pub description: String,
    pub url: String,
    #[serde(serialize_with = "join_authors")]
    pub authors: Vec<String>,
    pub build_date: String,
}

fn join_authors<S: serde::Serializer>(authors: &[String], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&authors.join(", "))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvironmentEntry {
    name: String,
    #[serde(default)]
    plugin_info: PluginInfo,
    #[serde(default)]
    keys: Vec<KeyEntry>,
}

#[derive(Debug, Deserialize)]
struct KeyEntry {
    name: String,
    default: serde_json::Value,
    #[serde(default)]
    sensitive: bool,
}

impl KeyEntry {
    fn into_key(self) -> Result<Key, DirectoryError> {
        let default = Value::try_from(self.default).map_err(|value| DirectoryError::InvalidDefault {
            key: self.name.clone(),
            value,
        })?;
        let key = Key::new(self.name, default);
        Ok(if self.sensitive { key.sensitive() } else { key })
    }
}

/// A named configuration scope, usually one per plugin.
#[derive(Debug, Clone)]
pub struct Environment {
    name: String,
    plugin_info: PluginInfo,
    keys: Vec<Key>,
    registry: Registry,
}

impl Environment {
    pub fn new(
        name: impl Into<String>,
        plugin_info: PluginInfo,
        keys: Vec<Key>,
        registry: Registry,
    ) -> Self {
        Self {
            name: name.into(),
            plugin_info,
            keys,
            registry,
        }
    }

    /// The framework's own environment, carrying the core keys.
    pub fn core(registry: Registry) -> Self {
        let plugin_info = PluginInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Anvil diagnostic dump".to_string(),
            url: "https://www.anvilpowered.org".to_string(),
            authors: vec!["AnvilPowered".to_string()],
            build_date: String::new(),
        };
        Self::new(CORE_ENVIRONMENT, plugin_info, keys::core(), registry)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plugin_info(&self) -> &PluginInfo {
        &self.plugin_info
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Ordered set of known environments. The core environment is always first.
#[derive(Debug)]
pub struct EnvironmentManager {
    core: Arc<Environment>,
    environments: RwLock<Vec<Arc<Environment>>>,
}

impl EnvironmentManager {
    pub fn new(core: Environment) -> Self {
        let core = Arc::new(core);
        Self {
            environments: RwLock::new(vec![core.clone()]),
            core,
        }
    }

    pub fn core(&self) -> Arc<Environment> {
        self.core.clone()
    }

    pub async fn register(&self, environment: Environment) -> Result<(), DirectoryError> {
        let mut environments = self.environments.write().await;
        if environments.iter().any(|e| e.name() == environment.name()) {
            return Err(DirectoryError::Duplicate(environment.name().to_string()));
        }
        info!("Registered environment {}", environment.name());
        environments.push(Arc::new(environment));
        Ok(())
    }

    /// Registers every environment described in a JSON file, in file order.
    /// Returns how many were added.
    pub async fn load_file(
        &self,
        path: impl AsRef<Path>,
        registry: &Registry,
    ) -> Result<usize, DirectoryError> {
        let bytes = fs::read(path.as_ref()).await?;
        let entries: Vec<EnvironmentEntry> = serde_json::from_slice(&bytes)?;
        let count = entries.len();
        for entry in entries {
            let keys = entry
                .keys
                .into_iter()
                .map(KeyEntry::into_key)
                .collect::<Result<Vec<_>, _>>()?;
            self.register(Environment::new(entry.name, entry.plugin_info, keys, registry.clone()))
                .await?;
        }
        Ok(count)
    }

    /// First key called `name` across all environments.
    pub async fn find_key(&self, name: &str) -> Option<Key> {
        self.environments
            .read()
            .await
            .iter()
            .flat_map(|e| e.keys())
            .find(|k| k.name() == name)
            .cloned()
    }

    pub async fn list(&self) -> Vec<Arc<Environment>> {
        self.environments.read().await.clone()
    }

    pub async fn find_by_name(&self, name: &str) -> Option<Arc<Environment>> {
        self.environments
            .read()
            .await
            .iter()
            .find(|e| e.name() == name)
            .cloned()
    }
}
