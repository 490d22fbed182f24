//! MCP server implementation for SQL database access.
//!
//! The server reads one JSON-RPC message per line, dispatches requests through
//! a method table, and writes exactly one reply line per request. Notifications
//! are logged and never answered. Messages are handled strictly in arrival
//! order; a slow tool call holds back everything behind it.
//!
//! # Methods
//!
//! | Method | Result |
//! |--------|--------|
//! | `initialize` | Server identity and capabilities |
//! | `tools/list` | The tool catalogue |
//! | `tools/call` | Runs one tool |
//! | `ping` | `{"status": "ok"}` |

use std::collections::HashMap;
use std::io;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::db::DataAccess;
use crate::mcp::protocol::{
    parse_message, IncomingMessage, JsonRpcError, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::transport::{LineTransport, StdioTransport};
use crate::tools::{ToolOutput, ToolRegistry};

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: Some(ToolCapabilities { list_changed: true }),
        }
    }
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request. Only used for logging.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    #[serde(default)]
    pub protocol_version: Option<String>,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call: the text summary plus the tool's structured fields.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Structured fields, serialised beside `content`.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl From<ToolOutput> for ToolCallResult {
    fn from(output: ToolOutput) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: output.summary,
            }],
            payload: output.payload,
        }
    }
}

/// The reply to one request line.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// A successful response.
    Success(JsonRpcResponse),
    /// An error response.
    Failure(JsonRpcError),
}

type MethodHandler = fn(&mut McpServer, &JsonRpcRequest) -> Result<Value, JsonRpcError>;

/// The MCP server for SQL database access.
pub struct McpServer {
    /// Tool catalogue.
    registry: ToolRegistry,
    /// Database access shared by every tool call.
    data_access: Box<dyn DataAccess>,
    /// Request method name to handler.
    methods: HashMap<&'static str, MethodHandler>,
}

impl McpServer {
    /// Creates a server with the standard tools over the given data access.
    #[must_use]
    pub fn new(data_access: Box<dyn DataAccess>) -> Self {
        Self::with_registry(ToolRegistry::standard(), data_access)
    }

    /// Creates a server with a custom tool registry.
    #[must_use]
    pub fn with_registry(registry: ToolRegistry, data_access: Box<dyn DataAccess>) -> Self {
        let mut methods: HashMap<&'static str, MethodHandler> = HashMap::new();
        methods.insert("initialize", Self::handle_initialize);
        methods.insert("tools/list", Self::handle_tools_list);
        methods.insert("tools/call", Self::handle_tools_call);
        methods.insert("ping", Self::handle_ping);

        Self {
            registry,
            data_access,
            methods,
        }
    }

    /// Runs the server on stdin/stdout until EOF or a shutdown signal, then
    /// closes the database connection.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> io::Result<()> {
        let mut transport = StdioTransport::stdio();
        let result = self.run_with_shutdown(&mut transport).await;
        self.shutdown();
        result
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(unix)]
    async fn run_with_shutdown(&mut self, transport: &mut StdioTransport) -> io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                    return Ok(());
                }

                line_result = transport.read_line() => {
                    if self.handle_transport_result(transport, line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(windows)]
    async fn run_with_shutdown(&mut self, transport: &mut StdioTransport) -> io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                    return Ok(());
                }

                line_result = transport.read_line() => {
                    if self.handle_transport_result(transport, line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles the result from transport read.
    ///
    /// Returns `true` once the input is closed.
    async fn handle_transport_result<R, W>(
        &mut self,
        transport: &mut LineTransport<R, W>,
        line_result: io::Result<Option<String>>,
    ) -> io::Result<bool>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let Some(line) = line_result? else {
            tracing::info!("Input closed, shutting down");
            return Ok(true);
        };

        self.respond(transport, &line).await?;
        Ok(false)
    }

    /// Serves every line from `transport` until EOF.
    ///
    /// Unlike [`Self::run`] this neither installs signal handlers nor closes
    /// the database connection.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn serve<R, W>(&mut self, transport: &mut LineTransport<R, W>) -> io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            let line_result = transport.read_line().await;
            if self.handle_transport_result(transport, line_result).await? {
                return Ok(());
            }
        }
    }

    async fn respond<R, W>(&mut self, transport: &mut LineTransport<R, W>, line: &str) -> io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        match self.handle_line(line) {
            Some(Reply::Success(response)) => transport.write_response(&response).await,
            Some(Reply::Failure(error)) => transport.write_error(&error).await,
            None => Ok(()),
        }
    }

    /// Closes the database connection.
    pub fn shutdown(&mut self) {
        self.data_access.close();
    }

    /// Handles one input line.
    ///
    /// Returns the reply to write, or `None` for blank lines and notifications.
    pub fn handle_line(&mut self, line: &str) -> Option<Reply> {
        if line.trim().is_empty() {
            return None;
        }

        match parse_message(line) {
            Ok(IncomingMessage::Request(req)) => Some(match self.handle_request(&req) {
                Ok(response) => Reply::Success(response),
                Err(error) => Reply::Failure(error),
            }),
            Ok(IncomingMessage::Notification(notif)) => {
                Self::handle_notification(&notif);
                None
            }
            Err(error) => {
                tracing::warn!(error = %error.error.message, "Rejected malformed message");
                Some(Reply::Failure(error))
            }
        }
    }

    fn handle_request(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        tracing::debug!(id = %req.id, method = %req.method, "Handling request");

        let handler = self
            .methods
            .get(req.method.as_str())
            .copied()
            .ok_or_else(|| JsonRpcError::method_not_found(req.id.clone(), &req.method))?;

        let result = handler(self, req)?;
        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    fn handle_notification(notif: &JsonRpcNotification) {
        match notif.method.as_deref() {
            Some("notifications/initialized") => {
                tracing::info!("Client initialisation complete");
            }
            Some(method) => tracing::debug!(method, "Ignoring notification"),
            None => tracing::warn!("Received notification without a method"),
        }
    }

    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<Value, JsonRpcError> {
        let params = req
            .params
            .clone()
            .and_then(|p| serde_json::from_value::<InitializeParams>(p).ok());

        match params {
            Some(InitializeParams {
                protocol_version,
                client_info: Some(client),
            }) => tracing::info!(
                client = %client.name,
                client_version = client.version.as_deref().unwrap_or("unknown"),
                protocol_version = protocol_version.as_deref().unwrap_or("unspecified"),
                "Initialize request received"
            ),
            _ => tracing::info!("Initialize request received"),
        }

        Ok(json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "serverName": SERVER_NAME,
            "serverVersion": env!("CARGO_PKG_VERSION"),
            "serverInfo": ServerInfo::default(),
            "capabilities": ServerCapabilities::default(),
        }))
    }

    fn handle_tools_list(&mut self, _req: &JsonRpcRequest) -> Result<Value, JsonRpcError> {
        let tools: Vec<_> = self.registry.definitions().collect();
        Ok(json!({ "tools": tools }))
    }

    fn handle_tools_call(&mut self, req: &JsonRpcRequest) -> Result<Value, JsonRpcError> {
        let Some(params) = req.params.as_ref() else {
            return Err(JsonRpcError::invalid_params(req.id.clone(), "Missing params"));
        };

        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return Err(JsonRpcError::invalid_params(req.id.clone(), "Missing tool name"));
        };

        let empty = Map::new();
        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(arguments)) => arguments,
            Some(_) => {
                return Err(JsonRpcError::invalid_params(
                    req.id.clone(),
                    "Tool arguments must be an object",
                ))
            }
        };

        tracing::info!(tool = name, "Calling tool");

        let output = self
            .registry
            .call(name, arguments, self.data_access.as_mut())
            .map_err(|e| {
                tracing::error!(tool = name, error = %e, "Tool call failed");
                JsonRpcError::internal_error(req.id.clone(), format!("Error executing tool: {e}"))
            })?;

        serde_json::to_value(ToolCallResult::from(output)).map_err(|e| {
            JsonRpcError::internal_error(req.id.clone(), format!("Internal error: {e}"))
        })
    }

    #[allow(clippy::unused_self)] // every method handler shares one signature
    fn handle_ping(&mut self, _req: &JsonRpcRequest) -> Result<Value, JsonRpcError> {
        Ok(json!({ "status": "ok" }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ColumnInfo, DataAccessResult, Row, WriteOutcome};

    /// Data access that answers from fixed values.
    struct FixedDataAccess {
        tables: Vec<String>,
    }

    impl DataAccess for FixedDataAccess {
        fn query(&mut self, _sql: &str) -> DataAccessResult<Vec<Row>> {
            let mut row = Row::new();
            row.insert("one".to_string(), json!(1));
            Ok(vec![row])
        }

        fn execute(&mut self, _sql: &str) -> DataAccessResult<u64> {
            Ok(2)
        }

        fn execute_returning_key(&mut self, _sql: &str) -> DataAccessResult<WriteOutcome> {
            Ok(WriteOutcome {
                affected_rows: 1,
                generated_key: Some(9),
            })
        }

        fn list_tables(&mut self, _database: Option<&str>) -> DataAccessResult<Vec<String>> {
            Ok(self.tables.clone())
        }

        fn describe_columns(&mut self, _table: &str) -> DataAccessResult<Vec<ColumnInfo>> {
            Ok(Vec::new())
        }

        fn get_ddl(&mut self, _database: Option<&str>, table: &str) -> DataAccessResult<String> {
            Ok(format!("CREATE TABLE {table} (id INT)"))
        }
    }

    fn server() -> McpServer {
        McpServer::new(Box::new(FixedDataAccess {
            tables: vec!["a".to_string(), "b".to_string()],
        }))
    }

    fn reply_json(server: &mut McpServer, line: &str) -> Value {
        let reply = server.handle_line(line).expect("expected a reply");
        serde_json::to_value(reply).unwrap()
    }

    #[test]
    fn ping_returns_status() {
        let mut server = server();
        let reply = reply_json(&mut server, r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
        assert_eq!(reply["id"], 1);
        assert_eq!(reply["result"]["status"], "ok");
    }

    #[test]
    fn initialize_describes_server() {
        let mut server = server();
        let reply = reply_json(
            &mut server,
            r#"{"jsonrpc":"2.0","id":"init","method":"initialize","params":{"protocolVersion":"2024-11-05","clientInfo":{"name":"test"}}}"#,
        );

        let result = &reply["result"];
        assert_eq!(reply["id"], "init");
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(result["serverName"], SERVER_NAME);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(result["capabilities"]["tools"]["listChanged"], true);
    }

    #[test]
    fn notifications_get_no_reply() {
        let mut server = server();
        assert!(server
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .is_none());
        assert!(server
            .handle_line(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#)
            .is_none());
        assert!(server.handle_line("   ").is_none());
    }

    #[test]
    fn unknown_method() {
        let mut server = server();
        let reply = reply_json(&mut server, r#"{"jsonrpc":"2.0","id":7,"method":"foo/bar"}"#);
        assert_eq!(reply["error"]["code"], -32601);
        assert_eq!(reply["error"]["message"], "Method not found: foo/bar");
    }

    #[test]
    fn tools_call_parameter_errors() {
        let mut server = server();

        let reply = reply_json(&mut server, r#"{"jsonrpc":"2.0","id":1,"method":"tools/call"}"#);
        assert_eq!(reply["error"]["code"], -32602);
        assert_eq!(reply["error"]["message"], "Missing params");

        let reply = reply_json(
            &mut server,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"arguments":{}}}"#,
        );
        assert_eq!(reply["error"]["code"], -32602);
        assert_eq!(reply["error"]["message"], "Missing tool name");
    }

    #[test]
    fn tool_failure_is_internal_error() {
        let mut server = server();
        let reply = reply_json(
            &mut server,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"nope"}}"#,
        );
        assert_eq!(reply["error"]["code"], -32603);
        assert_eq!(reply["error"]["message"], "Error executing tool: Unknown tool: nope");

        let reply = reply_json(
            &mut server,
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"execute_query","arguments":{}}}"#,
        );
        assert_eq!(
            reply["error"]["message"],
            "Error executing tool: Missing parameter: sql"
        );
    }

    #[test]
    fn tool_result_carries_summary_and_payload() {
        let mut server = server();
        let reply = reply_json(
            &mut server,
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"list_tables"}}"#,
        );

        let result = &reply["result"];
        assert_eq!(result["content"][0]["type"], "text");
        assert_eq!(result["content"][0]["text"], "Database tables (2):\n- a\n- b\n");
        assert_eq!(result["tables"], json!(["a", "b"]));
        assert_eq!(result["count"], 2);
    }

    #[test]
    fn insert_reports_generated_key() {
        let mut server = server();
        let reply = reply_json(
            &mut server,
            r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"insert_data","arguments":{"table":"t","data":{"x":1}}}}"#,
        );

        let result = &reply["result"];
        assert_eq!(
            result["content"][0]["text"],
            "Insert completed. Affected rows: 1, Generated key: 9"
        );
        assert_eq!(result["affectedRows"], 1);
        assert_eq!(result["generatedKey"], 9);
    }
}
