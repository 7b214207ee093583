use crate::{env::EnvManager, error::ConfigError};
use connectors::sql::postgres::pool::PgPoolConfig;
use engine_core::context::DatabaseContext;

pub mod database;
pub mod sync;

use sync::SyncSettings;

/// Everything a run needs from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub source: PgPoolConfig,
    pub destination: PgPoolConfig,
    pub sync: SyncSettings,
}

impl Settings {
    pub fn from_env(env: &EnvManager) -> Result<Self, ConfigError> {
        Ok(Settings {
            source: database::source_config(env)?,
            destination: database::destination_config(env)?,
            sync: SyncSettings::from_env(env)?,
        })
    }

    /// A context that connects lazily with these pool settings.
    pub fn database_context(&self) -> DatabaseContext {
        DatabaseContext::new(self.source.clone(), self.destination.clone())
    }
}
