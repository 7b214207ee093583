use connectors::sql::base::error::DbError;
use engine_core::error::{ContextError, LedgerError};
use thiserror::Error;

/// Errors of a sync run. Per-table failures are folded into the run
/// summary; only connection errors end the run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Database(#[from] DbError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Connection error: {0}")]
    Connection(#[from] ContextError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_errors_keep_their_message() {
        let err = SyncError::from(DbError::Unknown("boom".into()));
        assert_eq!(err.to_string(), "Unknown error: boom");

        let err = SyncError::from(LedgerError::MissingEntry(4));
        assert!(err.to_string().starts_with("Ledger error: "));
    }
}
