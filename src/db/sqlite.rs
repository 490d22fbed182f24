//! SQLite implementation of [`DataAccess`].
//!
//! The connection is opened on first use and kept for the lifetime of the
//! server. [`DataAccess::close`] drops it; the next call opens a fresh one.

use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;

use crate::config::DatabaseConfig;
use crate::db::{
    ColumnInfo, DataAccess, DataAccessError, DataAccessResult, Row, SqlDialect, WriteOutcome,
};

/// Schema searched when no database name is given.
const DEFAULT_SCHEMA: &str = "main";

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    /// Private in-memory database.
    Memory,
    /// Database file on disk.
    File(PathBuf),
}

impl SqliteTarget {
    /// Parses a connection URL.
    ///
    /// Accepted forms: `:memory:`, `sqlite::memory:`, `sqlite://<path>`,
    /// `sqlite:<path>` and a bare filesystem path.
    ///
    /// # Errors
    ///
    /// Returns [`DataAccessError::UnsupportedUrl`] for an empty URL or one that
    /// names another kind of database.
    pub fn parse(url: &str) -> DataAccessResult<Self> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(DataAccessError::unsupported_url(url, "URL is empty"));
        }

        let path = if let Some(rest) = trimmed.strip_prefix("sqlite://") {
            rest
        } else if let Some(rest) = trimmed.strip_prefix("sqlite:") {
            rest
        } else if trimmed.contains("://") || trimmed.starts_with("jdbc:") {
            let scheme = trimmed.split(':').next().unwrap_or(trimmed);
            return Err(DataAccessError::unsupported_url(
                url,
                format!("scheme '{scheme}' is not supported, use a sqlite: URL or a file path"),
            ));
        } else {
            trimmed
        };

        match path {
            "" => Err(DataAccessError::unsupported_url(url, "missing database path")),
            ":memory:" => Ok(Self::Memory),
            _ => Ok(Self::File(PathBuf::from(path))),
        }
    }
}

/// SQLite-backed data access with a lazily opened connection.
pub struct SqliteDataAccess {
    url: String,
    target: SqliteTarget,
    conn: Option<Connection>,
}

impl SqliteDataAccess {
    /// Creates a data access handle for the configured database.
    ///
    /// No connection is made until the first operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn new(settings: &DatabaseConfig) -> DataAccessResult<Self> {
        let target = SqliteTarget::parse(&settings.url)?;
        Ok(Self {
            url: settings.url.clone(),
            target,
            conn: None,
        })
    }

    /// Returns whether a connection is currently open.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Returns the open connection, connecting first if necessary.
    fn connection(&mut self) -> DataAccessResult<&mut Connection> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => self.open()?,
        };
        Ok(self.conn.insert(conn))
    }

    fn open(&self) -> DataAccessResult<Connection> {
        let conn = match &self.target {
            SqliteTarget::Memory => Connection::open_in_memory(),
            SqliteTarget::File(path) => Connection::open(path),
        }
        .map_err(|source| DataAccessError::Connection {
            url: self.url.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA foreign_keys = ON")
            .map_err(|source| DataAccessError::Connection {
                url: self.url.clone(),
                source,
            })?;

        tracing::info!(url = %self.url, "Connected to database");
        Ok(conn)
    }
}

impl DataAccess for SqliteDataAccess {
    fn query(&mut self, sql: &str) -> DataAccessResult<Vec<Row>> {
        tracing::debug!(sql, "Executing query");
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query([])?;
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (idx, name) in names.iter().enumerate() {
                record.insert(name.clone(), to_json(row.get_ref(idx)?));
            }
            results.push(record);
        }

        Ok(results)
    }

    fn execute(&mut self, sql: &str) -> DataAccessResult<u64> {
        tracing::debug!(sql, "Executing update");
        let conn = self.connection()?;
        let affected = conn.execute(sql, [])?;
        Ok(affected as u64)
    }

    fn execute_returning_key(&mut self, sql: &str) -> DataAccessResult<WriteOutcome> {
        tracing::debug!(sql, "Executing update with generated key");
        let conn = self.connection()?;
        let before = conn.last_insert_rowid();
        let affected = conn.execute(sql, [])?;

        // WITHOUT ROWID tables leave last_insert_rowid untouched
        let after = conn.last_insert_rowid();
        let generated_key = (affected > 0 && after != before).then_some(after);

        Ok(WriteOutcome {
            affected_rows: affected as u64,
            generated_key,
        })
    }

    fn list_tables(&mut self, database: Option<&str>) -> DataAccessResult<Vec<String>> {
        tracing::debug!(database, "Listing tables");
        let schema = SqlDialect::SQLITE.quote_identifier(database.unwrap_or(DEFAULT_SCHEMA));
        let sql = format!(
            "SELECT name FROM {schema}.sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
        );

        let conn = self.connection()?;
        let mut stmt = conn.prepare(&sql)?;
        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tables)
    }

    fn describe_columns(&mut self, table: &str) -> DataAccessResult<Vec<ColumnInfo>> {
        tracing::debug!(table, "Describing table columns");
        let (schema, name) = split_qualified(table);

        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT name, type, \"notnull\", dflt_value \
             FROM pragma_table_info(?1, ?2) ORDER BY cid",
        )?;
        let columns = stmt
            .query_map([name, schema], |row| {
                let declared: String = row.get(1)?;
                let (type_name, size) = split_declared_type(&declared);
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    type_name,
                    size,
                    nullable: row.get::<_, i64>(2)? == 0,
                    default_value: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(columns)
    }

    fn get_ddl(&mut self, database: Option<&str>, table: &str) -> DataAccessResult<String> {
        tracing::debug!(database, table, "Fetching table DDL");
        let (schema, name) = match database {
            Some(schema) => (schema, table),
            None => split_qualified(table),
        };
        let sql = format!(
            "SELECT sql FROM {}.sqlite_master WHERE type = 'table' AND name = ?1",
            SqlDialect::SQLITE.quote_identifier(schema)
        );

        let conn = self.connection()?;
        let ddl = conn
            .query_row(&sql, [name], |row| row.get::<_, Option<String>>(0))
            .optional()?
            .flatten();

        ddl.ok_or_else(|| DataAccessError::table_not_found(database, table))
    }

    fn dialect(&self) -> SqlDialect {
        SqlDialect::SQLITE
    }

    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            match conn.close() {
                Ok(()) => tracing::info!("Database connection closed"),
                Err((_, e)) => tracing::warn!(error = %e, "Failed to close database connection"),
            }
        }
    }
}

/// Splits `schema.table` on the first `.`; a bare name belongs to `main`.
fn split_qualified(table: &str) -> (&str, &str) {
    table.split_once('.').unwrap_or((DEFAULT_SCHEMA, table))
}

/// Converts a column value to JSON.
fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(BASE64_STANDARD.encode(bytes)),
    }
}

/// Splits a declared column type such as `VARCHAR(255)` into name and size.
fn split_declared_type(declared: &str) -> (String, Option<u32>) {
    let declared = declared.trim();
    match declared.split_once('(') {
        Some((base, rest)) => {
            let size = rest
                .split(|c: char| c == ',' || c == ')')
                .next()
                .and_then(|n| n.trim().parse().ok());
            (base.trim().to_string(), size)
        }
        None => (declared.to_string(), None),
    }
}
