//! Data access layer.
//!
//! The protocol engine never talks to a database driver directly. Every tool
//! goes through the [`DataAccess`] trait, which exposes the handful of
//! operations the tool catalogue needs:
//!
//! - run a statement and return its rows
//! - run a statement and return the affected-row count (optionally with the
//!   generated key)
//! - list tables, describe columns, fetch DDL
//!
//! [`SqliteDataAccess`] is the implementation shipped with the server.
//!
//! # Connection Lifecycle
//!
//! An implementation owns its single connection. It is opened lazily on the
//! first call, reopened if it was closed, and released by [`DataAccess::close`]
//! when the server shuts down.

pub mod error;
pub mod sqlite;

pub use error::{DataAccessError, DataAccessResult};
pub use sqlite::SqliteDataAccess;

use serde::Serialize;
use serde_json::{Map, Value};

/// A result row: column name to value, in select-list order.
pub type Row = Map<String, Value>;

/// Outcome of a write statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOutcome {
    /// Number of rows changed by the statement.
    pub affected_rows: u64,
    /// Key generated by the store for the inserted row, if any.
    pub generated_key: Option<i64>,
}

/// Column descriptor returned by [`DataAccess::describe_columns`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Type name as reported by the store.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Declared length or precision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Default value expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// Quoting and escaping rules of the backing store.
///
/// Used when statements are assembled from tool arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlDialect {
    /// Character used to delimit identifiers.
    pub identifier_quote: char,
    /// Whether a backslash inside a string literal starts an escape sequence.
    pub backslash_escapes: bool,
}

impl SqlDialect {
    /// MySQL-style quoting: backtick identifiers, backslash escapes.
    ///
    /// For implementations backed by a store that reads `\` as an escape.
    pub const MYSQL: Self = Self {
        identifier_quote: '`',
        backslash_escapes: true,
    };

    /// ANSI/SQLite quoting: double-quoted identifiers, no backslash escapes.
    pub const SQLITE: Self = Self {
        identifier_quote: '"',
        backslash_escapes: false,
    };

    /// Quotes a single identifier, doubling any embedded quote characters.
    #[must_use]
    pub fn quote_identifier(&self, ident: &str) -> String {
        let q = self.identifier_quote;
        let mut quoted = String::with_capacity(ident.len() + 2);
        quoted.push(q);
        for c in ident.chars() {
            if c == q {
                quoted.push(q);
            }
            quoted.push(c);
        }
        quoted.push(q);
        quoted
    }

    /// Quotes a possibly schema-qualified name (`schema.table`) part by part.
    #[must_use]
    pub fn quote_qualified(&self, name: &str) -> String {
        name.split('.')
            .map(|part| self.quote_identifier(part.trim()))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl Default for SqlDialect {
    fn default() -> Self {
        Self::SQLITE
    }
}

/// The narrow interface between the tool dispatcher and a relational store.
///
/// Calls are synchronous: the protocol engine waits for each one to finish
/// before reading the next message.
pub trait DataAccess {
    /// Runs a statement and returns every row it produces.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or the statement is rejected.
    fn query(&mut self, sql: &str) -> DataAccessResult<Vec<Row>>;

    /// Runs a write statement and returns the affected-row count.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or the statement is rejected.
    fn execute(&mut self, sql: &str) -> DataAccessResult<u64>;

    /// Runs a write statement and reports the generated key, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or the statement is rejected.
    fn execute_returning_key(&mut self, sql: &str) -> DataAccessResult<WriteOutcome>;

    /// Lists table names, optionally scoped to a named database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or the database is unknown.
    fn list_tables(&mut self, database: Option<&str>) -> DataAccessResult<Vec<String>>;

    /// Describes the columns of a table in declaration order.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    fn describe_columns(&mut self, table: &str) -> DataAccessResult<Vec<ColumnInfo>>;

    /// Returns the `CREATE TABLE` statement of a table.
    ///
    /// # Errors
    ///
    /// Returns [`DataAccessError::TableNotFound`] if the table does not exist.
    fn get_ddl(&mut self, database: Option<&str>, table: &str) -> DataAccessResult<String>;

    /// Quoting rules used when statements are built from tool arguments.
    fn dialect(&self) -> SqlDialect {
        SqlDialect::default()
    }

    /// Releases the connection, if one is open.
    fn close(&mut self) {}
}
