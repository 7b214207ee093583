use connectors::sql::base::error::{ConnectorError, DbError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Failed to connect to {role} database {target}: {source}")]
    Connect {
        role: &'static str,
        target: String,
        #[source]
        source: ConnectorError,
    },

    #[error("No {0} database is configured for this command")]
    NotConfigured(&'static str),
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger query failed: {0}")]
    Db(#[from] DbError),

    #[error("Ledger entry {0} does not exist")]
    MissingEntry(i64),

    #[error("Ledger row is malformed: {0}")]
    Malformed(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Db(DbError::Sql(err))
    }
}
