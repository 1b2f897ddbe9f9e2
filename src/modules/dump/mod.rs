pub mod commands;
pub mod error;
pub mod publisher;
pub mod report;

pub use commands::DumpCommand;
pub use publisher::DiagnosticPublisher;
