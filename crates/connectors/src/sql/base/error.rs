use thiserror::Error;

/// All errors coming from the database/query layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// Any SQL driver error.
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    /// A column came back in a shape the row decoder cannot represent.
    #[error("Cannot decode column `{column}` of type {type_name}: {reason}")]
    Decode {
        column: String,
        type_name: String,
        reason: String,
    },

    /// An error occurred while building a SQL query.
    #[error("Query build error: {0}")]
    QueryBuildError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Errors happening during pool or connection setup.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// SQLx failed to hand out or open a connection.
    #[error("SQLx connector creation failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Connection check returned {0}, expected 1")]
    UnexpectedProbe(i32),
}
