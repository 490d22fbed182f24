//! Tool catalogue and name-based dispatch.
//!
//! Each tool is a [`ToolDefinition`] (what `tools/list` shows) paired with a
//! [`ToolHandler`] (what `tools/call` runs). The registry is built once at
//! startup and never changes afterwards.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::{json, Map, Value};

use crate::db::DataAccess;
use crate::error::ToolError;
use crate::tools::handlers::{self, ToolArguments};
use crate::tools::ToolOutput;

/// Semantic kind of a tool parameter.
///
/// The kind decides the JSON schema type shown to callers and how the
/// dispatcher reads the argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// SQL text executed as given.
    SqlText,
    /// A table name, optionally schema-qualified.
    TableIdentifier,
    /// Column name to value object.
    KeyValueMap,
    /// Raw SQL condition appended after `WHERE`.
    WherePredicate,
    /// A database (schema) name.
    DatabaseIdentifier,
}

impl ParamKind {
    /// Returns the kind's name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SqlText => "sql-text",
            Self::TableIdentifier => "table-identifier",
            Self::KeyValueMap => "key-value-map",
            Self::WherePredicate => "where-predicate",
            Self::DatabaseIdentifier => "database-identifier",
        }
    }

    /// Returns the JSON schema type of arguments of this kind.
    #[must_use]
    pub const fn json_type(self) -> &'static str {
        match self {
            Self::KeyValueMap => "object",
            Self::SqlText
            | Self::TableIdentifier
            | Self::WherePredicate
            | Self::DatabaseIdentifier => "string",
        }
    }

    /// Reads an argument of this kind from its JSON value.
    ///
    /// Key-value maps must be objects. SQL text is any string. Identifiers
    /// and WHERE predicates must be non-blank strings, since an empty value
    /// would produce malformed or unbounded SQL.
    ///
    /// # Errors
    ///
    /// Returns an error if the value has the wrong JSON type or is blank.
    pub fn extract<'a>(self, name: &str, value: &'a Value) -> Result<Argument<'a>, ToolError> {
        match (self, value) {
            (Self::KeyValueMap, Value::Object(map)) => Ok(Argument::Map(map)),
            (Self::KeyValueMap, _) => Err(ToolError::invalid_argument(
                name,
                format!("{} must be an object", self.as_str()),
            )),
            (Self::SqlText, Value::String(text)) => Ok(Argument::Text(text)),
            (_, Value::String(text)) if text.trim().is_empty() => Err(ToolError::invalid_argument(
                name,
                format!("{} must not be empty", self.as_str()),
            )),
            (_, Value::String(text)) => Ok(Argument::Text(text)),
            (_, _) => Err(ToolError::invalid_argument(
                name,
                format!("{} must be a string", self.as_str()),
            )),
        }
    }

    /// Returns the default description for parameters of this kind.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::SqlText => "SQL statement",
            Self::TableIdentifier => "Table name",
            Self::KeyValueMap => "Data to insert or update (key-value pairs)",
            Self::WherePredicate => "WHERE condition (e.g., id=1)",
            Self::DatabaseIdentifier => "Database name (defaults to the current database)",
        }
    }
}

/// An argument value after it has been checked against its [`ParamKind`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Argument<'a> {
    /// A string argument.
    Text(&'a str),
    /// A column name to value object.
    Map(&'a Map<String, Value>),
}

/// One parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDefinition {
    /// Argument name.
    pub name: &'static str,
    /// Semantic kind.
    pub kind: ParamKind,
    /// Whether the argument must be present.
    pub required: bool,
    /// Human-readable description.
    pub description: &'static str,
}

impl ParamDefinition {
    /// A required parameter with the kind's default description.
    #[must_use]
    pub const fn required(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            description: kind.description(),
        }
    }

    /// An optional parameter with the kind's default description.
    #[must_use]
    pub const fn optional(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            description: kind.description(),
        }
    }
}

/// A tool definition for the `tools/list` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: &'static str,
    /// Short description.
    pub description: &'static str,
    /// Longer description, shown on the input schema.
    pub detailed_description: &'static str,
    /// Parameters in declaration order.
    pub params: Vec<ParamDefinition>,
}

impl ToolDefinition {
    /// Returns the names of the required parameters, in order.
    pub fn required_params(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.params.iter().filter(|p| p.required).map(|p| p.name)
    }

    /// Builds the JSON schema describing the tool's arguments.
    #[must_use]
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| {
                (
                    p.name.to_string(),
                    json!({
                        "type": p.kind.json_type(),
                        "description": p.description,
                    }),
                )
            })
            .collect();

        json!({
            "type": "object",
            "description": self.detailed_description,
            "properties": properties,
            "required": self.required_params().collect::<Vec<_>>(),
        })
    }
}

impl Serialize for ToolDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tool = serializer.serialize_struct("ToolDefinition", 3)?;
        tool.serialize_field("name", self.name)?;
        tool.serialize_field("description", self.description)?;
        tool.serialize_field("inputSchema", &self.input_schema())?;
        tool.end()
    }
}

/// Executes one tool against the data layer.
pub trait ToolHandler {
    /// Runs the tool. Arguments have already been read according to the
    /// tool's parameter kinds.
    ///
    /// # Errors
    ///
    /// Returns an error if the data layer fails.
    fn call(&self, args: &ToolArguments<'_>, db: &mut dyn DataAccess)
        -> Result<ToolOutput, ToolError>;
}

struct RegisteredTool {
    definition: ToolDefinition,
    handler: Box<dyn ToolHandler>,
}

/// The tool catalogue, keyed by tool name in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<&'static str, RegisteredTool>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the registry with the standard database tools.
    #[must_use]
    pub fn standard() -> Self {
        use ParamKind::{DatabaseIdentifier, KeyValueMap, SqlText, TableIdentifier, WherePredicate};

        let mut registry = Self::new();

        registry.register(
            ToolDefinition {
                name: "execute_query",
                description: "Execute SQL query",
                detailed_description: "Execute SELECT query and return results",
                params: vec![ParamDefinition::required("sql", SqlText)],
            },
            handlers::ExecuteQuery,
        );
        registry.register(
            ToolDefinition {
                name: "execute_update",
                description: "Execute SQL update",
                detailed_description: "Execute INSERT, UPDATE or DELETE statement",
                params: vec![ParamDefinition::required("sql", SqlText)],
            },
            handlers::ExecuteUpdate,
        );
        registry.register(
            ToolDefinition {
                name: "insert_data",
                description: "Insert data",
                detailed_description: "Insert data into specified table",
                params: vec![
                    ParamDefinition::required("table", TableIdentifier),
                    ParamDefinition::required("data", KeyValueMap),
                ],
            },
            handlers::InsertData,
        );
        registry.register(
            ToolDefinition {
                name: "update_data",
                description: "Update data",
                detailed_description: "Update data in specified table",
                params: vec![
                    ParamDefinition::required("table", TableIdentifier),
                    ParamDefinition::required("data", KeyValueMap),
                    ParamDefinition::required("where", WherePredicate),
                ],
            },
            handlers::UpdateData,
        );
        registry.register(
            ToolDefinition {
                name: "delete_data",
                description: "Delete data",
                detailed_description: "Delete data from specified table",
                params: vec![
                    ParamDefinition::required("table", TableIdentifier),
                    ParamDefinition::required("where", WherePredicate),
                ],
            },
            handlers::DeleteData,
        );
        registry.register(
            ToolDefinition {
                name: "list_tables",
                description: "List all tables",
                detailed_description: "Get all table names in the database",
                params: vec![ParamDefinition::optional("database", DatabaseIdentifier)],
            },
            handlers::ListTables,
        );
        registry.register(
            ToolDefinition {
                name: "describe_table",
                description: "Describe table structure",
                detailed_description: "Get column information for specified table",
                params: vec![ParamDefinition::required("table", TableIdentifier)],
            },
            handlers::DescribeTable,
        );
        registry.register(
            ToolDefinition {
                name: "get_table_ddl",
                description: "Get table DDL",
                detailed_description: "Get the CREATE TABLE statement for specified table",
                params: vec![
                    ParamDefinition::required("table", TableIdentifier),
                    ParamDefinition::optional("database", DatabaseIdentifier),
                ],
            },
            handlers::GetTableDdl,
        );

        registry
    }

    /// Adds a tool, replacing any tool registered under the same name.
    pub fn register(&mut self, definition: ToolDefinition, handler: impl ToolHandler + 'static) {
        self.tools.insert(
            definition.name,
            RegisteredTool {
                definition,
                handler: Box::new(handler),
            },
        );
    }

    /// Returns the definitions in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.values().map(|tool| &tool.definition)
    }

    /// Looks up a tool definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name).map(|tool| &tool.definition)
    }

    /// Reads the arguments by kind and runs the named tool.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool is unknown, a required argument is missing
    /// or unusable, or the tool itself fails.
    pub fn call(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
        db: &mut dyn DataAccess,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let args = ToolArguments::extract(&tool.definition, arguments)?;
        tool.handler.call(&args, db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalogue_names_in_order() {
        let registry = ToolRegistry::standard();
        let names: Vec<&str> = registry.definitions().map(|d| d.name).collect();
        assert_eq!(
            names,
            [
                "execute_query",
                "execute_update",
                "insert_data",
                "update_data",
                "delete_data",
                "list_tables",
                "describe_table",
                "get_table_ddl",
            ]
        );
    }

    #[test]
    fn required_params_follow_kinds() {
        let registry = ToolRegistry::standard();
        let required = |name: &str| -> Vec<&'static str> {
            registry.get(name).unwrap().required_params().collect()
        };

        assert_eq!(required("execute_query"), ["sql"]);
        assert_eq!(required("insert_data"), ["table", "data"]);
        assert_eq!(required("update_data"), ["table", "data", "where"]);
        assert_eq!(required("delete_data"), ["table", "where"]);
        assert!(required("list_tables").is_empty());
        assert_eq!(required("get_table_ddl"), ["table"]);
    }

    #[test]
    fn serialised_definition_has_input_schema() {
        let registry = ToolRegistry::standard();
        let tool = serde_json::to_value(registry.get("update_data").unwrap()).unwrap();

        assert_eq!(tool["name"], "update_data");
        assert_eq!(tool["description"], "Update data");
        assert_eq!(tool["inputSchema"]["type"], "object");
        assert_eq!(tool["inputSchema"]["description"], "Update data in specified table");
        assert_eq!(tool["inputSchema"]["properties"]["data"]["type"], "object");
        assert_eq!(tool["inputSchema"]["properties"]["where"]["type"], "string");
        assert_eq!(
            tool["inputSchema"]["required"],
            serde_json::json!(["table", "data", "where"])
        );
    }

    #[test]
    fn optional_database_is_not_required() {
        let registry = ToolRegistry::standard();
        let tool = serde_json::to_value(registry.get("list_tables").unwrap()).unwrap();

        assert_eq!(
            tool["inputSchema"]["properties"]["database"]["type"],
            "string"
        );
        assert_eq!(tool["inputSchema"]["required"], serde_json::json!([]));
    }

    #[test]
    fn kinds_decide_accepted_values() {
        let blank = json!("  ");
        let object = json!({"a": 1});

        assert_eq!(
            ParamKind::SqlText.extract("sql", &blank).unwrap(),
            Argument::Text("  ")
        );
        assert!(matches!(
            ParamKind::KeyValueMap.extract("data", &object),
            Ok(Argument::Map(map)) if map.len() == 1
        ));

        let err = ParamKind::TableIdentifier.extract("table", &blank).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'table': table-identifier must not be empty"
        );
        let err = ParamKind::WherePredicate.extract("where", &json!(1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'where': where-predicate must be a string"
        );
        let err = ParamKind::KeyValueMap.extract("data", &json!("x")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'data': key-value-map must be an object"
        );
    }

    struct Echo;

    impl ToolHandler for Echo {
        fn call(
            &self,
            args: &ToolArguments<'_>,
            _db: &mut dyn DataAccess,
        ) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::new(
                args.text("name")?,
                json!({ "tag": args.optional_text("tag")? }),
            ))
        }
    }

    fn echo_registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(
            ToolDefinition {
                name: "echo",
                description: "Echo",
                detailed_description: "Echo a table name",
                params: vec![
                    ParamDefinition::required("name", ParamKind::TableIdentifier),
                    ParamDefinition::optional("tag", ParamKind::DatabaseIdentifier),
                ],
            },
            Echo,
        );
        registry
    }

    fn arguments(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn dispatch_reads_arguments_by_kind() {
        let registry = echo_registry();
        let mut db =
            crate::db::SqliteDataAccess::new(&crate::config::DatabaseConfig::default()).unwrap();

        let out = registry
            .call("echo", &arguments(json!({"name": "users", "extra": 5})), &mut db)
            .unwrap();
        assert_eq!(out.summary, "users");
        assert!(out.payload["tag"].is_null());

        let err = registry
            .call("echo", &arguments(json!({"name": null})), &mut db)
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing parameter: name");

        let err = registry
            .call("echo", &arguments(json!({"name": "users", "tag": ""})), &mut db)
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { ref name, .. } if name == "tag"));

        let err = registry.call("nope", &Map::new(), &mut db).unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: nope");
    }
}
