//! sql-mcp-server: MCP server exposing a relational database to AI assistants
//!
//! Speaks line-delimited JSON-RPC on stdin/stdout. Logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use sql_mcp_server::config;
use sql_mcp_server::db::SqliteDataAccess;
use sql_mcp_server::mcp::server::McpServer;

/// MCP server exposing SQL database operations as tools.
///
/// Reads connection settings from a JSON config file, then from the
/// `DATABASE_URL` environment variable, then from the command line.
#[derive(Parser, Debug)]
#[command(name = "sql-mcp-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Database URL (overrides config file and environment)
    #[arg(long, value_name = "URL")]
    database_url: Option<String>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Builds the log filter. `RUST_LOG`, when set, takes precedence over the
/// level from the command line and config file.
fn build_filter(level: Level, rust_log: Option<&str>) -> EnvFilter {
    match rust_log.filter(|directives| !directives.trim().is_empty()) {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::default().add_directive(level.into()),
    }
}

/// Initialises the tracing subscriber. stdout carries protocol traffic only.
fn init_tracing(level: Level) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(level, rust_log.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the configuration, with `--database-url` applied before validation.
fn load_settings(args: &Args) -> Result<config::Config, sql_mcp_server::error::ConfigError> {
    config::load_config(args.config.as_deref(), args.database_url.as_deref())
}

/// Entry point for the sql-mcp-server.
fn main() -> ExitCode {
    let args = Args::parse();

    let cfg = match load_settings(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if args.config.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nConfig is read from: {}", default_path.display());
                    eprintln!("Create one based on config/example-config.json");
                }
            }
            return ExitCode::FAILURE;
        }
    };

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    // GPLv3 Section 5d notice
    eprintln!(
        "sql-mcp-server {}  Copyright (C) 2026  The Embedded Society",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("This program comes with ABSOLUTELY NO WARRANTY.");
    eprintln!("This is free software, licensed under GPL-3.0-or-later.");
    eprintln!("Source: {}", env!("CARGO_PKG_REPOSITORY"));
    eprintln!("Database: {}", cfg.database.url);
    eprintln!();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting sql-mcp-server"
    );

    let data_access = match SqliteDataAccess::new(&cfg.database) {
        Ok(data_access) => data_access,
        Err(e) => {
            error!(error = %e, "Invalid database settings");
            return ExitCode::FAILURE;
        }
    };

    let mut server = McpServer::new(Box::new(data_access));

    info!("MCP server ready, waiting for client connection...");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server.run()) {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
