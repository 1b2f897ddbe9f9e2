use crate::environment::{Environment, PluginInfo};
use indexmap::IndexMap;
use serde::Serialize;

pub const REDACTED: &str = "***";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub os: String,
    pub os_version: String,
    pub architecture: String,
    pub runtime_version: String,
    pub runtime_vendor: String,
    pub platform: String,
}

impl SystemInfo {
    /// Read fresh on every call; nothing here is cached.
    pub fn collect(platform: &str) -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            os_version: os_version(),
            architecture: std::env::consts::ARCH.to_string(),
            runtime_version: env!("CARGO_PKG_VERSION").to_string(),
            runtime_vendor: env!("CARGO_PKG_NAME").to_string(),
            platform: platform.to_string(),
        }
    }
}

#[cfg(target_os = "linux")]
fn os_version() -> String {
    std::fs::read_to_string("/proc/sys/kernel/osrelease")
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

#[cfg(not(target_os = "linux"))]
fn os_version() -> String {
    String::new()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSnapshot {
    pub plugin_info: PluginInfo,
    pub keys: IndexMap<String, String>,
}

impl EnvironmentSnapshot {
    /// Resolves every key of `environment`. Sensitive values are replaced
    /// with [`REDACTED`] before they ever reach the snapshot.
    pub async fn collect(environment: &Environment) -> Self {
        let mut keys = IndexMap::with_capacity(environment.keys().len());
        for key in environment.keys() {
            let rendered = if key.is_sensitive() {
                REDACTED.to_string()
            } else {
                key.render(&environment.registry().get_or_default(key).await)
            };
            keys.insert(key.name().to_string(), rendered);
        }

        Self {
            plugin_info: environment.plugin_info().clone(),
            keys,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticReport {
    pub system: SystemInfo,
    pub plugins: IndexMap<String, EnvironmentSnapshot>,
}

impl DiagnosticReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
