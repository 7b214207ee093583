use engine_config::error::ConfigError;
use engine_core::error::{ContextError, LedgerError};
use engine_runtime::error::SyncError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to run the sync: {0}")]
    Sync(#[from] SyncError),

    #[error("Connection error: {0}")]
    Connection(#[from] ContextError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Invalid log filter: {0}")]
    LogFilter(String),
}
