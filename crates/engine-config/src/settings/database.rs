use crate::{env::EnvManager, error::ConfigError};
use connectors::sql::postgres::pool::{PgConnectionSettings, PgPoolConfig, PoolSettings};
use std::time::Duration;

const DEFAULT_PORT: u16 = 5432;

/// Per-database fallbacks. `None` marks a variable as required.
struct Defaults {
    prefix: &'static str,
    host: Option<&'static str>,
    database: Option<&'static str>,
    user: Option<&'static str>,
    pool: PoolSettings,
}

const SOURCE: Defaults = Defaults {
    prefix: "SOURCE_DB",
    host: None,
    database: None,
    user: None,
    pool: PoolSettings {
        max_connections: 5,
        idle_timeout: Duration::from_secs(30),
        connect_timeout: Duration::from_secs(10),
    },
};

const DESTINATION: Defaults = Defaults {
    prefix: "DEST_DB",
    host: Some("localhost"),
    database: Some("analytics"),
    user: Some("analytics"),
    pool: PoolSettings {
        max_connections: 10,
        idle_timeout: Duration::from_secs(30),
        connect_timeout: Duration::from_secs(5),
    },
};

/// `SOURCE_DB_*`: host, name and user are required.
pub fn source_config(env: &EnvManager) -> Result<PgPoolConfig, ConfigError> {
    load(env, &SOURCE)
}

/// `DEST_DB_*`: everything has a local default.
pub fn destination_config(env: &EnvManager) -> Result<PgPoolConfig, ConfigError> {
    load(env, &DESTINATION)
}

fn load(env: &EnvManager, defaults: &Defaults) -> Result<PgPoolConfig, ConfigError> {
    let var = |suffix: &str| format!("{}_{suffix}", defaults.prefix);
    let text = |suffix: &str, default: Option<&str>| -> Result<String, ConfigError> {
        let key = var(suffix);
        match (env.get(&key), default) {
            (Some(value), _) => Ok(value.to_string()),
            (None, Some(default)) => Ok(default.to_string()),
            (None, None) => Err(ConfigError::Missing(key)),
        }
    };
    let millis = |suffix: &str, default: Duration| -> Result<Duration, ConfigError> {
        let ms = env.get_parsed(&var(suffix), default.as_millis() as u64)?;
        Ok(Duration::from_millis(ms))
    };

    let connection = PgConnectionSettings {
        host: text("HOST", defaults.host)?,
        port: env.get_parsed(&var("PORT"), DEFAULT_PORT)?,
        database: text("NAME", defaults.database)?,
        user: text("USER", defaults.user)?,
        password: text("PASSWORD", Some(""))?,
        ssl: env.get_flag(&var("SSL")),
    };

    let max_connections = env.get_parsed(&var("POOL_MAX"), defaults.pool.max_connections)?;
    if max_connections == 0 {
        return Err(ConfigError::Invalid {
            var: var("POOL_MAX"),
            value: "0".to_string(),
            reason: "a pool needs at least one connection".to_string(),
        });
    }

    let pool = PoolSettings {
        max_connections,
        idle_timeout: millis("IDLE_TIMEOUT_MS", defaults.pool.idle_timeout)?,
        connect_timeout: millis("CONNECT_TIMEOUT_MS", defaults.pool.connect_timeout)?,
    };

    Ok(PgPoolConfig { connection, pool })
}
