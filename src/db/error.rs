//! Error types for data access operations.

use thiserror::Error;

/// Result type for data access operations.
pub type DataAccessResult<T> = Result<T, DataAccessError>;

/// Errors reported by a [`DataAccess`](super::DataAccess) implementation.
///
/// The display text always carries the underlying driver message so that it
/// can be surfaced to the caller unchanged.
#[derive(Debug, Error)]
pub enum DataAccessError {
    /// The connection to the store could not be established.
    #[error("Failed to connect to {url}: {source}")]
    Connection {
        /// Connection URL (never includes credentials).
        url: String,
        /// Underlying driver error.
        #[source]
        source: rusqlite::Error,
    },

    /// A statement failed to prepare or execute.
    #[error("{0}")]
    Statement(#[from] rusqlite::Error),

    /// The requested table does not exist.
    #[error("Table not found: {table}")]
    TableNotFound {
        /// Table name as requested (schema-qualified when a schema was given).
        table: String,
    },

    /// The connection URL names a store this build cannot open.
    #[error("Unsupported database URL '{url}': {reason}")]
    UnsupportedUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl DataAccessError {
    /// Creates a table not found error.
    pub fn table_not_found(database: Option<&str>, table: &str) -> Self {
        let table = match database {
            Some(db) => format!("{db}.{table}"),
            None => table.to_string(),
        };
        Self::TableNotFound { table }
    }

    /// Creates an unsupported URL error.
    pub fn unsupported_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
