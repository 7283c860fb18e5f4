//! Backend-for-frontend gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                   BFF GATEWAY                    │
//!                        │                                                  │
//!   Browser request      │  ┌──────────┐   ┌──────────────┐   ┌──────────┐  │
//!   ─────────────────────┼─▶│   http   │──▶│ session gate │──▶│ handlers │  │
//!   (cookies)            │  │  server  │   │verify/refresh│   │  relay   │  │
//!                        │  └──────────┘   └──────┬───────┘   └────┬─────┘  │
//!                        │                        │                │        │
//!                        │                        ▼                ▼        │
//!                        │                 ┌─────────────────────────────┐  │
//!                        │                 │       upstream client       │──┼──▶ Upstream API
//!                        │                 └─────────────────────────────┘  │
//!                        │                                                  │
//!                        │  config · observability · lifecycle              │
//!                        └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use bff_gateway::config::{load_config, GatewayConfig};
use bff_gateway::observability::{logging, metrics};
use bff_gateway::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "bff-gateway")]
#[command(about = "Session-gating backend-for-frontend gateway", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Upstream API base URL (overrides the config file).
    #[arg(long, env = "BACKEND_URL")]
    backend_url: Option<String>,

    /// Bind address (overrides the config file).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(url) = cli.backend_url {
        config.upstream.base_url = url;
    }
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    bff_gateway::config::validation::validate_config(&config)
        .map_err(bff_gateway::config::ConfigError::Validation)?;

    logging::init_logging(&config.observability);

    tracing::info!("bff-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        upstream_timeout_secs = config.upstream.timeout_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
