//! # hash-mcp
//!
//! Hash tool server binary. Loads settings, sets up logging and metrics,
//! and serves the SSE transport until interrupted.

#![deny(unsafe_code)]

mod settings;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use hash_server::config::ServerConfig;
use hash_server::server::HashServer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Hash tool server over MCP with an SSE transport.
#[derive(Parser, Debug)]
#[command(name = "hash-mcp", version, about = "Hash tool server over MCP (SSE transport)")]
struct Cli {
    /// Host to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// JSON settings file merged over the defaults.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Seconds between heartbeat comments on each stream.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    heartbeat_secs: Option<u64>,

    /// Comma-separated origins allowed for cross-origin requests.
    #[arg(long, value_delimiter = ',')]
    allowed_origins: Option<Vec<String>>,

    /// Log output format.
    #[arg(long, env = "HASH_MCP_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Do not install the Prometheus recorder; `/metrics` returns 404.
    #[arg(long)]
    no_metrics: bool,
}

impl Cli {
    /// Apply flags over settings loaded from file and environment.
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(secs) = self.heartbeat_secs {
            config.heartbeat_interval_secs = secs;
        }
        if let Some(origins) = &self.allowed_origins {
            config.allowed_origins = hash_server::config::parse_origins(&origins.join(","));
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format);

    let mut config =
        settings::load_settings(args.config.as_deref()).context("Failed to load settings")?;
    args.apply(&mut config);

    let metrics = if args.no_metrics {
        None
    } else {
        match hash_server::metrics::install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "metrics recorder unavailable, /metrics disabled");
                None
            }
        }
    };

    let tools = hash_tools::create_default_registry();
    let tool_count = tools.len();
    let server = HashServer::new(config, tools, metrics);

    let (addr, handle) = server
        .listen()
        .await
        .context("Failed to bind server")?;
    info!("hash MCP server listening on http://{addr}/sse ({tool_count} tools registered)");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    info!("Shutting down...");
    server.shutdown().graceful_shutdown(vec![handle], None).await;
    info!("Shutdown complete");
    Ok(())
}
