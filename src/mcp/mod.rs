//! Model Context Protocol (MCP) server implementation.
//!
//! Exposes relational database operations as tools to AI assistants. The
//! server communicates over stdio using line-delimited JSON-RPC 2.0 messages.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP Server                          │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │   │  Transport  │───▶│   Method    │───▶│    Tool     │     │
//! │   │   (stdio)   │    │   router    │    │  registry   │     │
//! │   └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                                │            │
//! │                                                ▼            │
//! │                                         ┌─────────────┐     │
//! │                                         │ Data access │     │
//! │                                         └─────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod protocol;
pub mod server;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::{McpServer, Reply};
pub use transport::{LineTransport, StdioTransport};
