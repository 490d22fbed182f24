//! SQL statement assembly for the data-manipulation tools.
//!
//! `insert_data`, `update_data` and `delete_data` receive structured
//! arguments rather than SQL, so the statement text is built here:
//!
//! - table and column names are quoted with the store's identifier quote
//! - values are rendered as literals according to their JSON type
//! - WHERE predicates are caller-supplied SQL and are appended verbatim
//!
//! # Literal Rendering
//!
//! | JSON value | SQL literal |
//! |------------|-------------|
//! | `null` | `NULL` |
//! | string | `'...'` with `'` doubled (and `\` doubled where backslash escapes) |
//! | number | as written |
//! | boolean | `TRUE` / `FALSE` |
//!
//! Arrays and objects have no literal form and are rejected.

use serde_json::{Map, Value};

use crate::db::SqlDialect;
use crate::error::ToolError;

/// Renders one column value as a SQL literal.
///
/// # Errors
///
/// Returns [`ToolError::InvalidArgument`] for arrays and objects.
pub fn render_literal(dialect: SqlDialect, column: &str, value: &Value) -> Result<String, ToolError> {
    match value {
        Value::Null => Ok("NULL".to_string()),
        Value::Bool(true) => Ok("TRUE".to_string()),
        Value::Bool(false) => Ok("FALSE".to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(quote_string(dialect, s)),
        Value::Array(_) | Value::Object(_) => Err(ToolError::invalid_argument(
            format!("data.{column}"),
            "arrays and objects cannot be stored as a column value",
        )),
    }
}

fn quote_string(dialect: SqlDialect, s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' if dialect.backslash_escapes => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Builds `INSERT INTO <table> (<columns>) VALUES (<literals>)`.
///
/// Columns appear in the order of `data`'s keys.
///
/// # Errors
///
/// Returns an error if `data` is empty or holds a value with no literal form.
pub fn insert(dialect: SqlDialect, table: &str, data: &Map<String, Value>) -> Result<String, ToolError> {
    require_columns(data)?;

    let columns: Vec<String> = data.keys().map(|k| dialect.quote_identifier(k)).collect();
    let values = data
        .iter()
        .map(|(column, value)| render_literal(dialect, column, value))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.quote_qualified(table),
        columns.join(", "),
        values.join(", ")
    ))
}

/// Builds `UPDATE <table> SET <column> = <literal>, ... WHERE <predicate>`.
///
/// # Errors
///
/// Returns an error if `data` is empty or holds a value with no literal form.
pub fn update(
    dialect: SqlDialect,
    table: &str,
    data: &Map<String, Value>,
    predicate: &str,
) -> Result<String, ToolError> {
    require_columns(data)?;

    let assignments = data
        .iter()
        .map(|(column, value)| {
            render_literal(dialect, column, value)
                .map(|literal| format!("{} = {literal}", dialect.quote_identifier(column)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(format!(
        "UPDATE {} SET {} WHERE {predicate}",
        dialect.quote_qualified(table),
        assignments.join(", ")
    ))
}

/// Builds `DELETE FROM <table> WHERE <predicate>`.
#[must_use]
pub fn delete(dialect: SqlDialect, table: &str, predicate: &str) -> String {
    format!("DELETE FROM {} WHERE {predicate}", dialect.quote_qualified(table))
}

fn require_columns(data: &Map<String, Value>) -> Result<(), ToolError> {
    if data.is_empty() {
        return Err(ToolError::invalid_argument(
            "data",
            "must contain at least one column",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn single_quote_is_doubled() {
        let data = object(json!({"name": "a'b"}));
        let sql = insert(SqlDialect::SQLITE, "t", &data).unwrap();
        assert_eq!(sql, r#"INSERT INTO "t" ("name") VALUES ('a''b')"#);
    }

    #[test]
    fn backslash_depends_on_dialect() {
        let value = json!(r"C:\tmp");
        assert_eq!(
            render_literal(SqlDialect::MYSQL, "path", &value).unwrap(),
            r"'C:\\tmp'"
        );
        assert_eq!(
            render_literal(SqlDialect::SQLITE, "path", &value).unwrap(),
            r"'C:\tmp'"
        );
    }

    #[test]
    fn scalar_literals() {
        let d = SqlDialect::SQLITE;
        assert_eq!(render_literal(d, "c", &Value::Null).unwrap(), "NULL");
        assert_eq!(render_literal(d, "c", &json!(true)).unwrap(), "TRUE");
        assert_eq!(render_literal(d, "c", &json!(false)).unwrap(), "FALSE");
        assert_eq!(render_literal(d, "c", &json!(42)).unwrap(), "42");
        assert_eq!(render_literal(d, "c", &json!(-1.5)).unwrap(), "-1.5");
    }

    #[test]
    fn nested_values_are_rejected() {
        let err = render_literal(SqlDialect::SQLITE, "tags", &json!(["a"])).unwrap_err();
        assert!(err.to_string().contains("data.tags"));

        let data = object(json!({"meta": {"k": 1}}));
        assert!(insert(SqlDialect::SQLITE, "t", &data).is_err());
    }

    #[test]
    fn insert_keeps_key_order() {
        let data = object(json!({"zeta": 1, "alpha": null, "mid": "x"}));
        let sql = insert(SqlDialect::MYSQL, "shop.items", &data).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO `shop`.`items` (`zeta`, `alpha`, `mid`) VALUES (1, NULL, 'x')"
        );
    }

    #[test]
    fn update_appends_predicate_verbatim() {
        let data = object(json!({"name": "O'Brien", "active": false}));
        let sql = update(SqlDialect::SQLITE, "users", &data, "id = 7 AND org = 'x'").unwrap();
        assert_eq!(
            sql,
            r#"UPDATE "users" SET "name" = 'O''Brien', "active" = FALSE WHERE id = 7 AND org = 'x'"#
        );
    }

    #[test]
    fn delete_statement() {
        assert_eq!(
            delete(SqlDialect::SQLITE, "users", "id=1"),
            r#"DELETE FROM "users" WHERE id=1"#
        );
    }

    #[test]
    fn empty_data_is_rejected() {
        let data = Map::new();
        assert!(insert(SqlDialect::SQLITE, "t", &data).is_err());
        assert!(update(SqlDialect::SQLITE, "t", &data, "1=1").is_err());
    }
}
