use crate::{env::EnvManager, error::ConfigError};
use serde::Serialize;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncSettings {
    /// Rows between progress log lines. Has no transactional meaning.
    pub batch_size: usize,
    pub debug: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            batch_size: DEFAULT_BATCH_SIZE,
            debug: false,
        }
    }
}

impl SyncSettings {
    pub fn from_env(env: &EnvManager) -> Result<Self, ConfigError> {
        let batch_size = env.get_parsed("SYNC_BATCH_SIZE", DEFAULT_BATCH_SIZE)?.max(1);
        Ok(SyncSettings {
            batch_size,
            debug: env.get_flag("DEBUG"),
        })
    }
}
