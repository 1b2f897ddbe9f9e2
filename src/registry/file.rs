use super::Value;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tokio::{fs, time};
use tracing::{debug, error};

pub type Overrides = HashMap<String, Value>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("writing {0} timed out")]
    Timeout(PathBuf),
}

/// Bincode file holding registry overrides. Writes go to a sibling temp
/// file first and are renamed into place, so a crash never leaves a
/// half-written registry behind.
#[derive(Debug, Clone)]
pub struct OverrideFile {
    path: PathBuf,
}

impl OverrideFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means no overrides. An unreadable one is logged and
    /// ignored; the next save replaces it.
    pub async fn load(&self) -> Overrides {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No registry at {}, using defaults", self.path.display());
                return Overrides::new();
            }
            Err(e) => {
                error!("Failed to read registry {}: {}", self.path.display(), e);
                return Overrides::new();
            }
        };

        bincode::deserialize(&bytes).unwrap_or_else(|e| {
            error!("Failed to decode registry {}: {}", self.path.display(), e);
            Overrides::new()
        })
    }

    pub async fn save(&self, overrides: &Overrides) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let bytes = bincode::serialize(overrides)?;
        let tmp = self.path.with_extension("tmp");
        let write = async {
            fs::write(&tmp, bytes).await?;
            fs::rename(&tmp, &self.path).await
        };

        match time::timeout(Duration::from_secs(5), write).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StoreError::Timeout(self.path.clone())),
        }
    }
}
