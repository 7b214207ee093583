use crate::sql::base::error::ConnectorError;
use sqlx::{
    Connection, PgConnection, PgPool,
    pool::PoolConnectionMetadata,
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
};
use std::{fmt, time::Duration};
use tracing::{debug, warn};

/// Where to connect. The password never appears in `Debug` or `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct PgConnectionSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    /// Require TLS, without certificate verification.
    pub ssl: bool,
}

impl PgConnectionSettings {
    pub fn connect_options(&self) -> PgConnectOptions {
        let ssl_mode = if self.ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Disable
        };

        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .password(&self.password)
            .ssl_mode(ssl_mode)
    }

    /// `user@host:port/db`
    pub fn target(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

impl fmt::Display for PgConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target())?;
        if self.ssl {
            f.write_str(" (tls)")?;
        }
        Ok(())
    }
}

impl fmt::Debug for PgConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .field("ssl", &self.ssl)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
}

/// Connection target plus pool limits for one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgPoolConfig {
    pub connection: PgConnectionSettings,
    pub pool: PoolSettings,
}

impl PgPoolConfig {
    /// Builds a pool without opening any connection. Idle connections are
    /// pinged on acquire; broken ones are logged and discarded.
    pub fn build_pool(&self) -> PgPool {
        let connected = self.connection.target();
        let checked = self.connection.target();
        PgPoolOptions::new()
            .max_connections(self.pool.max_connections)
            .idle_timeout(self.pool.idle_timeout)
            .acquire_timeout(self.pool.connect_timeout)
            // Replaced by the logging health check below.
            .test_before_acquire(false)
            .after_connect(move |_conn, _meta| {
                let target = connected.clone();
                Box::pin(async move {
                    debug!("Opened connection to {target}");
                    Ok::<_, sqlx::Error>(())
                })
            })
            .before_acquire(move |conn, meta| {
                let target = checked.clone();
                Box::pin(async move {
                    Ok::<_, sqlx::Error>(check_idle_connection(conn, meta, &target).await)
                })
            })
            .connect_lazy_with(self.connection.connect_options())
    }
}

/// `false` tells the pool to close the connection and hand out another one.
async fn check_idle_connection(
    conn: &mut PgConnection,
    meta: PoolConnectionMetadata,
    target: &str,
) -> bool {
    match conn.ping().await {
        Ok(()) => true,
        Err(err) => {
            warn!(
                "Discarding broken connection to {target} (idle {}ms): {err}",
                meta.idle_for.as_millis()
            );
            false
        }
    }
}

/// Acquires one connection and runs `SELECT 1` on it.
pub async fn ping(pool: &PgPool) -> Result<(), ConnectorError> {
    let mut conn = pool.acquire().await?;
    let one: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&mut *conn).await?;
    if one != 1 {
        return Err(ConnectorError::UnexpectedProbe(one));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> PgConnectionSettings {
        PgConnectionSettings {
            host: "db.internal".into(),
            port: 6543,
            database: "app".into(),
            user: "reader".into(),
            password: "hunter2".into(),
            ssl: true,
        }
    }

    #[test]
    fn test_display_and_debug_redact_password() {
        let settings = settings();
        assert_eq!(settings.to_string(), "reader@db.internal:6543/app (tls)");
        let debug = format!("{settings:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_connect_options_carry_target() {
        let options = settings().connect_options();
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_database(), Some("app"));
        assert_eq!(options.get_username(), "reader");
        assert!(matches!(options.get_ssl_mode(), PgSslMode::Require));
    }

    #[tokio::test]
    async fn test_lazy_pool_opens_nothing() {
        let config = PgPoolConfig {
            connection: settings(),
            pool: PoolSettings {
                max_connections: 5,
                idle_timeout: Duration::from_secs(30),
                connect_timeout: Duration::from_secs(10),
            },
        };
        let pool = config.build_pool();
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.options().get_max_connections(), 5);
        // The before-acquire hook does the health check instead.
        assert!(!pool.options().get_test_before_acquire());
    }
}
