//! Handlers for the standard database tools.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde_json::{json, Map, Value};

use crate::db::{ColumnInfo, DataAccess};
use crate::error::ToolError;
use crate::tools::registry::{Argument, ToolDefinition, ToolHandler};
use crate::tools::{statement, ToolOutput};

/// The arguments of one `tools/call`, read according to the tool's
/// parameter kinds.
///
/// A JSON `null` is treated the same as an absent argument. Arguments the
/// tool does not declare are ignored.
#[derive(Debug, Clone, Default)]
pub struct ToolArguments<'a> {
    values: HashMap<&'static str, Argument<'a>>,
}

impl<'a> ToolArguments<'a> {
    /// Reads every declared parameter of `definition` from `values`.
    ///
    /// # Errors
    ///
    /// Returns an error if a required argument is missing or any present
    /// argument does not fit its kind.
    pub fn extract(
        definition: &ToolDefinition,
        values: &'a Map<String, Value>,
    ) -> Result<Self, ToolError> {
        let mut extracted = HashMap::with_capacity(definition.params.len());
        for param in &definition.params {
            match values.get(param.name).filter(|v| !v.is_null()) {
                Some(value) => {
                    extracted.insert(param.name, param.kind.extract(param.name, value)?);
                }
                None if param.required => {
                    return Err(ToolError::MissingArgument(param.name.to_string()));
                }
                None => {}
            }
        }
        Ok(Self { values: extracted })
    }

    /// Returns `true` if the argument was supplied.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Returns a required string argument.
    ///
    /// # Errors
    ///
    /// Returns an error if the argument is missing or is not a string kind.
    pub fn text(&self, name: &str) -> Result<&'a str, ToolError> {
        self.optional_text(name)?
            .ok_or_else(|| ToolError::MissingArgument(name.to_string()))
    }

    /// Returns an optional string argument.
    ///
    /// # Errors
    ///
    /// Returns an error if the argument is present but is not a string kind.
    pub fn optional_text(&self, name: &str) -> Result<Option<&'a str>, ToolError> {
        match self.values.get(name).copied() {
            None => Ok(None),
            Some(Argument::Text(text)) => Ok(Some(text)),
            Some(Argument::Map(_)) => Err(ToolError::invalid_argument(name, "must be a string")),
        }
    }

    /// Returns a required object argument.
    ///
    /// # Errors
    ///
    /// Returns an error if the argument is missing or is not a map kind.
    pub fn object(&self, name: &str) -> Result<&'a Map<String, Value>, ToolError> {
        match self.values.get(name).copied() {
            None => Err(ToolError::MissingArgument(name.to_string())),
            Some(Argument::Map(map)) => Ok(map),
            Some(Argument::Text(_)) => Err(ToolError::invalid_argument(name, "must be an object")),
        }
    }
}

/// `execute_query`: runs a row-returning statement.
pub struct ExecuteQuery;

impl ToolHandler for ExecuteQuery {
    fn call(&self, args: &ToolArguments<'_>, db: &mut dyn DataAccess) -> Result<ToolOutput, ToolError> {
        let sql = args.text("sql")?;
        let rows = db.query(sql)?;
        let count = rows.len();

        Ok(ToolOutput::new(
            format!("Query returned {count} row(s)"),
            json!({ "rows": rows, "count": count }),
        ))
    }
}

/// `execute_update`: runs a data-modifying statement.
pub struct ExecuteUpdate;

impl ToolHandler for ExecuteUpdate {
    fn call(&self, args: &ToolArguments<'_>, db: &mut dyn DataAccess) -> Result<ToolOutput, ToolError> {
        let sql = args.text("sql")?;
        let affected = db.execute(sql)?;
        Ok(update_output(affected))
    }
}

/// `insert_data`: inserts one row built from a column map.
pub struct InsertData;

impl ToolHandler for InsertData {
    fn call(&self, args: &ToolArguments<'_>, db: &mut dyn DataAccess) -> Result<ToolOutput, ToolError> {
        let table = args.text("table")?;
        let data = args.object("data")?;
        let sql = statement::insert(db.dialect(), table, data)?;

        tracing::debug!(table, sql = %sql, "Inserting row");
        let outcome = db.execute_returning_key(&sql)?;

        let mut summary = format!("Insert completed. Affected rows: {}", outcome.affected_rows);
        let mut payload = json!({ "affectedRows": outcome.affected_rows });
        if let Some(key) = outcome.generated_key {
            let _ = write!(summary, ", Generated key: {key}");
            payload["generatedKey"] = json!(key);
        }

        Ok(ToolOutput::new(summary, payload))
    }
}

/// `update_data`: updates the rows matching a predicate.
pub struct UpdateData;

impl ToolHandler for UpdateData {
    fn call(&self, args: &ToolArguments<'_>, db: &mut dyn DataAccess) -> Result<ToolOutput, ToolError> {
        let table = args.text("table")?;
        let data = args.object("data")?;
        let predicate = args.text("where")?;
        let sql = statement::update(db.dialect(), table, data, predicate)?;

        tracing::debug!(table, sql = %sql, "Updating rows");
        let affected = db.execute(&sql)?;
        Ok(update_output(affected))
    }
}

/// `delete_data`: deletes the rows matching a predicate.
pub struct DeleteData;

impl ToolHandler for DeleteData {
    fn call(&self, args: &ToolArguments<'_>, db: &mut dyn DataAccess) -> Result<ToolOutput, ToolError> {
        let table = args.text("table")?;
        let predicate = args.text("where")?;
        let sql = statement::delete(db.dialect(), table, predicate);

        tracing::debug!(table, sql = %sql, "Deleting rows");
        let affected = db.execute(&sql)?;

        Ok(ToolOutput::new(
            format!("Delete completed. Affected rows: {affected}"),
            json!({ "affectedRows": affected }),
        ))
    }
}

/// `list_tables`: lists base tables of the current or named database.
pub struct ListTables;

impl ToolHandler for ListTables {
    fn call(&self, args: &ToolArguments<'_>, db: &mut dyn DataAccess) -> Result<ToolOutput, ToolError> {
        let database = args.optional_text("database")?;
        let tables = db.list_tables(database)?;

        let mut summary = match database {
            Some(name) => format!("Tables in database '{name}' ({}):\n", tables.len()),
            None => format!("Database tables ({}):\n", tables.len()),
        };
        for table in &tables {
            let _ = writeln!(summary, "- {table}");
        }

        let mut payload = json!({ "tables": tables, "count": tables.len() });
        if let Some(name) = database {
            payload["database"] = json!(name);
        }

        Ok(ToolOutput::new(summary, payload))
    }
}

/// `describe_table`: reports the column layout of a table.
pub struct DescribeTable;

impl ToolHandler for DescribeTable {
    fn call(&self, args: &ToolArguments<'_>, db: &mut dyn DataAccess) -> Result<ToolOutput, ToolError> {
        let table = args.text("table")?;
        let columns = db.describe_columns(table)?;

        let mut summary = format!("Table structure for '{table}' ({} columns):\n", columns.len());
        for column in &columns {
            let _ = writeln!(summary, "{}", describe_column(column));
        }

        Ok(ToolOutput::new(
            summary,
            json!({ "table": table, "columns": columns }),
        ))
    }
}

fn describe_column(column: &ColumnInfo) -> String {
    let mut line = format!("- {} ({}", column.name, column.type_name);
    if let Some(size) = column.size {
        let _ = write!(line, "({size})");
    }
    line.push(')');
    if !column.nullable {
        line.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default_value {
        let _ = write!(line, " DEFAULT {default}");
    }
    line
}

/// `get_table_ddl`: returns the stored CREATE TABLE text.
pub struct GetTableDdl;

impl ToolHandler for GetTableDdl {
    fn call(&self, args: &ToolArguments<'_>, db: &mut dyn DataAccess) -> Result<ToolOutput, ToolError> {
        let table = args.text("table")?;
        let database = args.optional_text("database")?;
        let ddl = db.get_ddl(database, table)?;

        let qualified = match database {
            Some(name) => format!("{name}.{table}"),
            None => table.to_string(),
        };
        let mut payload = json!({ "table": table, "ddl": ddl });
        if let Some(name) = database {
            payload["database"] = json!(name);
        }

        Ok(ToolOutput::new(
            format!("DDL for table '{qualified}':\n{ddl}"),
            payload,
        ))
    }
}

fn update_output(affected: u64) -> ToolOutput {
    ToolOutput::new(
        format!("Update completed. Affected rows: {affected}"),
        json!({ "affectedRows": affected }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRegistry;

    fn extract<'a>(
        tool: &str,
        values: &'a Map<String, Value>,
    ) -> Result<ToolArguments<'a>, ToolError> {
        let registry = ToolRegistry::standard();
        ToolArguments::extract(registry.get(tool).unwrap(), values)
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn null_counts_as_missing() {
        let values = object(json!({"sql": null}));
        let err = extract("execute_query", &values).unwrap_err();
        assert!(matches!(err, ToolError::MissingArgument(ref name) if name == "sql"));
    }

    #[test]
    fn wrong_types_are_rejected() {
        let values = object(json!({"table": "t", "data": "x"}));
        assert!(matches!(
            extract("insert_data", &values),
            Err(ToolError::InvalidArgument { .. })
        ));

        let values = object(json!({"table": "  ", "where": "id=1"}));
        assert!(matches!(
            extract("delete_data", &values),
            Err(ToolError::InvalidArgument { ref name, .. }) if name == "table"
        ));

        let values = object(json!({"sql": 5}));
        assert!(matches!(
            extract("execute_update", &values),
            Err(ToolError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn accessors_follow_extracted_kinds() {
        let values = object(json!({"table": "t", "data": {"a": 1}, "where": "id=1"}));
        let args = extract("update_data", &values).unwrap();

        assert_eq!(args.text("table").unwrap(), "t");
        assert_eq!(args.object("data").unwrap().len(), 1);
        assert!(matches!(args.text("data"), Err(ToolError::InvalidArgument { .. })));
        assert!(matches!(args.object("where"), Err(ToolError::InvalidArgument { .. })));
    }

    #[test]
    fn optional_argument_may_be_absent() {
        let values = object(json!({"database": null, "other": 3}));
        let args = extract("list_tables", &values).unwrap();
        assert!(!args.contains("database"));
        assert!(!args.contains("other"));
        assert_eq!(args.optional_text("database").unwrap(), None);
    }

    #[test]
    fn column_line_format() {
        let column = ColumnInfo {
            name: "title".to_string(),
            type_name: "VARCHAR".to_string(),
            size: Some(80),
            nullable: false,
            default_value: Some("'untitled'".to_string()),
        };
        assert_eq!(
            describe_column(&column),
            "- title (VARCHAR(80)) NOT NULL DEFAULT 'untitled'"
        );

        let plain = ColumnInfo {
            name: "note".to_string(),
            type_name: "TEXT".to_string(),
            size: None,
            nullable: true,
            default_value: None,
        };
        assert_eq!(describe_column(&plain), "- note (TEXT)");
    }
}
