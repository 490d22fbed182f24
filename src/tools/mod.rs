//! Database tools exposed over MCP.
//!
//! | Tool | Purpose |
//! |------|---------|
//! | `execute_query` | Run a SELECT and return rows |
//! | `execute_update` | Run INSERT/UPDATE/DELETE SQL |
//! | `insert_data` | Insert one row from a column map |
//! | `update_data` | Update rows matching a WHERE predicate |
//! | `delete_data` | Delete rows matching a WHERE predicate |
//! | `list_tables` | List tables of a database |
//! | `describe_table` | Column layout of a table |
//! | `get_table_ddl` | CREATE TABLE text of a table |

pub mod handlers;
pub mod registry;
pub mod statement;

pub use handlers::ToolArguments;
pub use registry::{
    Argument, ParamDefinition, ParamKind, ToolDefinition, ToolHandler, ToolRegistry,
};

use serde_json::{Map, Value};

/// The result of a successful tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Human-readable summary, sent as the text content item.
    pub summary: String,
    /// Structured fields placed beside `content` in the result.
    pub payload: Map<String, Value>,
}

impl ToolOutput {
    /// Creates an output from a summary and a JSON object payload.
    ///
    /// A non-object payload is stored under `"value"`.
    pub fn new(summary: impl Into<String>, payload: Value) -> Self {
        let payload = match payload {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Self {
            summary: summary.into(),
            payload,
        }
    }
}
