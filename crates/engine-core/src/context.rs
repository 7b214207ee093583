use crate::{error::ContextError, retry::RetryPolicy};
use connectors::sql::postgres::pool::{PgPoolConfig, ping};
use sqlx::PgPool;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Owns the source and destination pools for one run.
///
/// Each pool is built on first use, pinged through the retry policy, and
/// reused until [`DatabaseContext::close_all`].
pub struct DatabaseContext {
    source_config: Option<PgPoolConfig>,
    destination_config: PgPoolConfig,
    retry: RetryPolicy,
    source: OnceCell<PgPool>,
    destination: OnceCell<PgPool>,
}

impl DatabaseContext {
    pub fn new(source_config: PgPoolConfig, destination_config: PgPoolConfig) -> Self {
        DatabaseContext {
            source_config: Some(source_config),
            destination_config,
            retry: RetryPolicy::for_connection(),
            source: OnceCell::new(),
            destination: OnceCell::new(),
        }
    }

    /// A context for ledger-only work; asking it for the source pool fails.
    pub fn destination_only(destination_config: PgPoolConfig) -> Self {
        DatabaseContext {
            source_config: None,
            destination_config,
            retry: RetryPolicy::for_connection(),
            source: OnceCell::new(),
            destination: OnceCell::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn source_pool(&self) -> Result<&PgPool, ContextError> {
        let config = self
            .source_config
            .as_ref()
            .ok_or(ContextError::NotConfigured("source"))?;
        self.source
            .get_or_try_init(|| connect("source", config, &self.retry))
            .await
    }

    pub async fn destination_pool(&self) -> Result<&PgPool, ContextError> {
        self.destination
            .get_or_try_init(|| connect("destination", &self.destination_config, &self.retry))
            .await
    }

    pub fn is_connected(&self) -> (bool, bool) {
        (self.source.initialized(), self.destination.initialized())
    }

    /// Closes whichever pools were opened. The context can be reused afterwards.
    pub async fn close_all(&mut self) {
        for (role, cell) in [
            ("source", &mut self.source),
            ("destination", &mut self.destination),
        ] {
            if let Some(pool) = cell.take() {
                pool.close().await;
                info!("Closed {role} pool");
            }
        }
    }
}

async fn connect(
    role: &'static str,
    config: &PgPoolConfig,
    retry: &RetryPolicy,
) -> Result<PgPool, ContextError> {
    let target = config.connection.to_string();
    info!("Connecting to {role} database {target}");

    let pool = config.build_pool();
    let label = format!("{role} connection");
    if let Err(source) = retry.run(&label, || ping(&pool)).await {
        pool.close().await;
        warn!("Giving up on {role} database {target}");
        return Err(ContextError::Connect {
            role,
            target,
            source,
        });
    }

    info!(
        "Connected to {role} database {target} (max {} connections)",
        config.pool.max_connections
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::sql::postgres::pool::{PgConnectionSettings, PoolSettings};
    use std::time::Duration;

    fn unreachable() -> PgPoolConfig {
        PgPoolConfig {
            connection: PgConnectionSettings {
                host: "127.0.0.1".into(),
                // Reserved port; nothing listens here.
                port: 1,
                database: "none".into(),
                user: "nobody".into(),
                password: "secret".into(),
                ssl: false,
            },
            pool: PoolSettings {
                max_connections: 1,
                idle_timeout: Duration::from_secs(1),
                connect_timeout: Duration::from_millis(200),
            },
        }
    }

    #[tokio::test]
    async fn test_unreachable_source_fails_without_caching() {
        let mut ctx = DatabaseContext::new(unreachable(), unreachable())
            .with_retry(RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(1)));

        let err = ctx.source_pool().await.unwrap_err();
        assert!(matches!(err, ContextError::Connect { role: "source", .. }));
        assert!(!err.to_string().contains("secret"));
        assert_eq!(ctx.is_connected(), (false, false));

        ctx.close_all().await;
        assert_eq!(ctx.is_connected(), (false, false));
    }

    #[tokio::test]
    async fn test_destination_only_context_has_no_source() {
        let ctx = DatabaseContext::destination_only(unreachable());
        let err = ctx.source_pool().await.unwrap_err();
        assert!(matches!(err, ContextError::NotConfigured("source")));
    }
}
