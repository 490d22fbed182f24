//! sql-mcp-server: MCP server exposing a relational database to AI assistants
//!
//! The server speaks line-delimited JSON-RPC 2.0 on stdin/stdout and offers a
//! fixed set of tools for querying, modifying and inspecting a database.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`db`]: Data access layer and the SQLite backend
//! - [`error`]: Error types
//! - [`mcp`]: MCP protocol implementation
//! - [`tools`]: Tool catalogue and handlers

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod tools;
