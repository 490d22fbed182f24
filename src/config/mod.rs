//! Configuration file loading and parsing.
//!
//! This module handles loading the configuration file from disk and parsing
//! it into validated, type-safe structures.
//!
//! # Configuration Sources
//!
//! Settings are layered, later sources winning:
//!
//! 1. Built-in defaults (in-memory database, `warn` logging)
//! 2. The configuration file:
//!    - path given on the command line, which must exist, or
//!    - the default location if present:
//!      - **Linux/macOS:** `~/.sql-mcp-server/config.json`
//!      - **Windows:** `%USERPROFILE%\.sql-mcp-server\config.json`
//! 3. The `DATABASE_URL` environment variable
//! 4. The `--database-url` command-line option
//!
//! Validation runs once, after every layer has been applied.
//!
//! # Example Configuration
//!
//! ```json
//! {
//!   "database": { "url": "sqlite://data/app.db" },
//!   "logging": { "level": "info" }
//! }
//! ```

mod settings;

pub use settings::{Config, DatabaseConfig, LoggingConfig, ENV_DATABASE_URL};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns the default configuration directory.
///
/// - **Linux/macOS:** `~/.sql-mcp-server/`
/// - **Windows:** `%USERPROFILE%\.sql-mcp-server\`
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".sql-mcp-server"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads the configuration, applies the environment and `database_url`
/// overrides, then validates the result.
///
/// If `path` is `None`, the default location is used when a file exists there;
/// otherwise the built-in defaults apply.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given configuration file cannot be found
/// - The file cannot be read
/// - The JSON is malformed
/// - Required fields are missing or invalid
pub fn load_config(path: Option<&Path>, database_url: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => read_config_file(p)?,
        None => match default_config_path() {
            Some(p) if p.exists() => read_config_file(&p)?,
            _ => Config::default(),
        },
    };

    config.apply_env();
    if let Some(url) = database_url {
        config.database.url = url.to_string();
    }
    config.validate()?;

    Ok(config)
}

fn read_config_file(config_path: &Path) -> Result<Config, ConfigError> {
    if !config_path.exists() {
        return Err(ConfigError::NotFound {
            path: config_path.to_path_buf(),
        });
    }

    let contents = std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: config_path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_path_exists() {
        let path = default_config_path();
        assert!(path.is_some());
        assert!(path.unwrap().to_string_lossy().contains("config.json"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");

        let err = load_config(Some(&missing), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn command_line_url_replaces_invalid_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "database": { "url": "mysql://db.internal/app" } }"#).unwrap();

        let err = read_config_file(&path).unwrap().validate().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));

        let config = load_config(Some(&path), Some(":memory:")).unwrap();
        assert_eq!(config.database.url, ":memory:");
    }

    #[test]
    fn read_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "logging": { "level": "info" } }"#).unwrap();

        let config = read_config_file(&path).unwrap();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = read_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
