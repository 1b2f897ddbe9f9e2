use reqwest::Url;
use std::{path::PathBuf, time::Duration};
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "http://dump.anvilpowered.org";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid collector endpoint {0}: {1}")]
    Endpoint(String, String),
    #[error("invalid {0}: {1}")]
    Value(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct DumpConfig {
    /// Collector base URL, without trailing slash.
    pub endpoint: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub platform: String,
    pub registry_path: Option<PathBuf>,
    /// JSON file describing extra plugin environments.
    pub environments_path: Option<PathBuf>,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: "AnvilPowered".to_string(),
            platform: "standalone".to_string(),
            registry_path: None,
            environments_path: None,
        }
    }
}

impl DumpConfig {
    /// Reads `ANVIL_*` variables; unset ones keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(endpoint) = std::env::var("ANVIL_DUMP_ENDPOINT") {
            config = config.with_endpoint(&endpoint)?;
        }
        if let Ok(secs) = std::env::var("ANVIL_DUMP_TIMEOUT_SECS") {
            let secs = secs
                .parse::<u64>()
                .map_err(|e| ConfigError::Value("ANVIL_DUMP_TIMEOUT_SECS", e.to_string()))?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Ok(platform) = std::env::var("ANVIL_PLATFORM") {
            config.platform = platform;
        }
        if let Ok(path) = std::env::var("ANVIL_REGISTRY_PATH") {
            config.registry_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("ANVIL_ENVIRONMENTS_PATH") {
            config.environments_path = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(endpoint)
            .map_err(|e| ConfigError::Endpoint(endpoint.to_string(), e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Endpoint(
                endpoint.to_string(),
                "scheme must be http or https".into(),
            ));
        }
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn upload_url(&self) -> String {
        format!("{}/dump", self.endpoint)
    }

    pub fn share_url(&self, key: &str) -> String {
        format!("{}/{}.json", self.endpoint, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_follow_endpoint() {
        let config = DumpConfig::default()
            .with_endpoint("http://localhost:8080/")
            .unwrap();
        assert_eq!(config.upload_url(), "http://localhost:8080/dump");
        assert_eq!(config.share_url("abc123"), "http://localhost:8080/abc123.json");
    }

    #[test]
    fn rejects_bad_endpoints() {
        assert!(DumpConfig::default().with_endpoint("not a url").is_err());
        assert!(DumpConfig::default().with_endpoint("ftp://host").is_err());
    }

    #[test]
    fn default_points_at_anvil_collector() {
        let config = DumpConfig::default();
        assert_eq!(config.upload_url(), "http://dump.anvilpowered.org/dump");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
