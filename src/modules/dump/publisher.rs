use super::error::{PublishError, PublishResult, TransportCause};
use super::report::{DiagnosticReport, EnvironmentSnapshot, SystemInfo};
use crate::config::DumpConfig;
use crate::environment::{EnvironmentManager, CORE_ENVIRONMENT};
use indexmap::IndexMap;
use reqwest::{header::CONTENT_TYPE, redirect, StatusCode};
use serde::Deserialize;
use std::{future::Future, sync::Arc, time::Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Named(Vec<String>),
}

#[derive(Deserialize)]
struct CollectorResponse {
    key: String,
}

/// Collects diagnostics from registered environments and uploads them to the
/// dump collector. Holds no per-call state, so one instance can serve any
/// number of concurrent publishes.
#[derive(Debug)]
pub struct DiagnosticPublisher {
    config: DumpConfig,
    environments: Arc<EnvironmentManager>,
}

impl DiagnosticPublisher {
    pub fn new(config: DumpConfig, environments: Arc<EnvironmentManager>) -> Self {
        Self {
            config,
            environments,
        }
    }

    pub fn environments(&self) -> &Arc<EnvironmentManager> {
        &self.environments
    }

    pub async fn collect_report(&self, selection: &Selection) -> Result<DiagnosticReport, PublishError> {
        let known = self.environments.list().await;
        let selected = match selection {
            Selection::All => known,
            Selection::Named(names) => {
                let missing: Vec<String> = names
                    .iter()
                    .filter(|name| !known.iter().any(|e| e.name() == name.as_str()))
                    .cloned()
                    .collect();
                // Directory order, not request order.
                let resolved: Vec<_> = known
                    .into_iter()
                    .filter(|e| names.iter().any(|name| name == e.name()))
                    .collect();
                if resolved.is_empty() {
                    return Err(PublishError::NoMatchingEnvironments { requested: missing });
                }
                if !missing.is_empty() {
                    warn!("Skipping unknown environments: {}", missing.join(" "));
                }
                resolved
            }
        };

        let mut plugins = IndexMap::with_capacity(selected.len() + 1);
        let core = self.environments.core();
        plugins.insert(
            CORE_ENVIRONMENT.to_string(),
            EnvironmentSnapshot::collect(&core).await,
        );
        for environment in selected
            .iter()
            .filter(|e| e.name() != CORE_ENVIRONMENT)
        {
            plugins.insert(
                environment.name().to_string(),
                EnvironmentSnapshot::collect(environment).await,
            );
        }

        Ok(DiagnosticReport {
            system: SystemInfo::collect(&self.config.platform),
            plugins,
        })
    }

    /// Runs one collect, serialize, upload cycle. Never panics on remote
    /// failures; every outcome comes back as a [`PublishResult`].
    pub async fn publish(&self, selection: Selection) -> PublishResult {
        let result = self.try_publish(&selection).await;
        match &result {
            Ok(url) => info!("Dump published to {}", url),
            Err(e) if e.is_logged() => error!("An error occurred posting dump: {}", e),
            Err(e) => debug!("Dump not published: {}", e),
        }
        result
    }

    async fn try_publish(&self, selection: &Selection) -> PublishResult {
        debug!("Collecting dump for {:?}", selection);
        let report = self.collect_report(selection).await?;

        debug!("Serializing {} environments", report.plugins.len());
        let body = report
            .to_json()
            .map_err(|e| PublishError::Serialization(e.to_string()))?;

        debug!("Uploading {} bytes to {}", body.len(), self.config.upload_url());
        self.upload(body).await
    }

    async fn upload(&self, body: String) -> PublishResult {
        // Built per call so each dump gets its own pool and resolver, both
        // dropped with the client when this function returns.
        let client = reqwest::Client::builder()
            .user_agent(&self.config.user_agent)
            .timeout(self.config.timeout)
            .redirect(redirect::Policy::limited(10))
            .pool_max_idle_per_host(0)
            .build()
            .map_err(transport_failure)?;

        let start = Instant::now();
        let response = client
            .post(self.config.upload_url())
            .header(CONTENT_TYPE, "text/plain")
            .header("AnvilPowered", "Dump")
            .body(body)
            .send()
            .await
            .map_err(transport_failure)?;
        debug!("Collector answered {} in {:?}", response.status(), start.elapsed());

        if response.status() != StatusCode::OK {
            return Err(PublishError::ServerRejected {
                status: response.status().as_u16(),
            });
        }

        let text = response.text().await.map_err(transport_failure)?;
        let key = parse_key(&text)?;
        Ok(self.config.share_url(&key))
    }

    /// Publishes on the runtime and hands the outcome to `on_complete`.
    /// Returns immediately.
    pub fn spawn<F, Fut>(self: &Arc<Self>, selection: Selection, on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce(PublishResult) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let publisher = Arc::clone(self);
        tokio::spawn(async move {
            let result = publisher.publish(selection).await;
            on_complete(result).await;
        })
    }
}

fn transport_failure(error: reqwest::Error) -> PublishError {
    PublishError::TransportFailure {
        cause: TransportCause::classify(&error),
        message: error.to_string(),
    }
}

fn parse_key(body: &str) -> Result<String, PublishError> {
    if body.trim().is_empty() {
        return Err(PublishError::MalformedResponse("empty response body".into()));
    }
    serde_json::from_str::<CollectorResponse>(body)
        .map(|response| response.key)
        .map_err(|e| PublishError::MalformedResponse(e.to_string()))
}
