use anvil_dump::host::{CommandAdapter, Console, ConsolePermissions, ConsoleText, Error};
use anvil_dump::tasks::InFlight;
use anvil_dump::{DiagnosticPublisher, DumpCommand, DumpConfig, Environment, EnvironmentManager, Registry};
use clap::Parser;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::{debug, info, warn};

/// Publish an Anvil diagnostic dump and print the shareable link.
#[derive(Parser, Debug)]
#[command(name = "anvil-dump", version)]
struct Cli {
    /// Dump every known environment
    #[arg(short, long)]
    all: bool,

    /// Collector base URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Upload timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Platform name reported in the system block
    #[arg(long)]
    platform: Option<String>,

    /// Registry file holding configuration overrides
    #[arg(long)]
    registry: Option<PathBuf>,

    /// JSON file describing plugin environments
    #[arg(long)]
    environments: Option<PathBuf>,

    /// Override a key before dumping; saved when --registry is set
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Environments to dump
    plugins: Vec<String>,
}

impl Cli {
    fn config(&self) -> Result<DumpConfig, Error> {
        let mut config = DumpConfig::from_env()?;
        if let Some(endpoint) = &self.endpoint {
            config = config.with_endpoint(endpoint)?;
        }
        if let Some(secs) = self.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(platform) = &self.platform {
            config.platform = platform.clone();
        }
        if let Some(path) = &self.registry {
            config.registry_path = Some(path.clone());
        }
        if let Some(path) = &self.environments {
            config.environments_path = Some(path.clone());
        }
        Ok(config)
    }

    fn command_args(&self) -> Vec<String> {
        if self.all {
            vec!["--all".to_string()]
        } else {
            self.plugins.clone()
        }
    }
}

async fn apply_override(
    environments: &EnvironmentManager,
    registry: &Registry,
    raw: &str,
) -> Result<(), Error> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {}", raw))?;
    let key = environments
        .find_key(name.trim())
        .await
        .ok_or_else(|| format!("unknown key {}", name.trim()))?;
    registry.set(&key, key.parse(value)?).await?;
    info!("Set {}", key.name());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = cli.config()?;
    debug!("Using {:?}", config);

    let registry = match &config.registry_path {
        Some(path) => Registry::open(path).await,
        None => Registry::in_memory(),
    };
    let environments = Arc::new(EnvironmentManager::new(Environment::core(registry.clone())));
    if let Some(path) = &config.environments_path {
        let count = environments.load_file(path, &registry).await?;
        info!("Loaded {} environments from {}", count, path.display());
    }
    for raw in &cli.overrides {
        apply_override(&environments, &registry, raw).await?;
    }

    info!("Publishing dump to {}", config.upload_url());
    let publisher = Arc::new(DiagnosticPublisher::new(config, environments));
    let in_flight = Arc::new(InFlight::new());
    let command: DumpCommand<Console> = DumpCommand::new(
        publisher,
        registry,
        Arc::new(ConsolePermissions::default()),
        Arc::new(ConsoleText),
        in_flight.clone(),
    );

    command.execute(&Console, &cli.command_args()).await?;

    tokio::select! {
        _ = in_flight.wait() => {}
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, abandoning dump");
            in_flight.shutdown().await;
        }
    }
    Ok(())
}
