//! Error types for sql-mcp-server.
//!
//! # Security Note
//!
//! Error messages never echo configuration contents. Configuration errors
//! name the file, and database errors carry the connection URL only.

use std::path::PathBuf;

use thiserror::Error;

use crate::db::DataAccessError;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised while executing a tool call.
///
/// The display text becomes the cause in
/// `"Error executing tool: <cause>"` responses.
#[derive(Error, Debug)]
pub enum ToolError {
    /// No tool is registered under the requested name.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A required argument was not supplied.
    #[error("Missing parameter: {0}")]
    MissingArgument(String),

    /// An argument was supplied with an unusable value.
    #[error("Invalid parameter '{name}': {message}")]
    InvalidArgument {
        /// Argument name.
        name: String,
        /// Description of what's wrong.
        message: String,
    },

    /// The data layer rejected the operation.
    #[error(transparent)]
    DataAccess(#[from] DataAccessError),
}

impl ToolError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }
}
