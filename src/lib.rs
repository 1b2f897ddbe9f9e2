//! Diagnostic dumps for Anvil environments: collect plugin and system
//! information, redact sensitive keys, and publish the report to the dump
//! collector.

pub mod config;
pub mod environment;
pub mod host;
pub mod modules;
pub mod registry;
pub mod tasks;

pub use config::DumpConfig;
pub use environment::{Environment, EnvironmentManager, PluginInfo};
pub use modules::dump::{DiagnosticPublisher, DumpCommand};
pub use registry::Registry;
