use model::sync::catalog::CatalogError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read env file {path}: {reason}")]
    EnvFile { path: String, reason: String },

    #[error("Invalid env file: {0}")]
    Malformed(String),

    #[error("Missing required environment variable {0}")]
    Missing(String),

    #[error("Invalid value `{value}` for {var}: {reason}")]
    Invalid {
        var: String,
        value: String,
        reason: String,
    },

    #[error("Invalid table catalog: {0}")]
    Catalog(#[from] CatalogError),
}
