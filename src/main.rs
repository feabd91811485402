//! API Gateway
//!
//! A prefix-routing reverse proxy with per-client rate limiting, built with
//! Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                              ┌──────────────────────────────────────────────────────┐
//!                              │                     API GATEWAY                       │
//!                              │                                                       │
//!     Client Request           │  ┌─────────┐    ┌────────────┐    ┌──────────────┐   │
//!     ─────────────────────────┼─▶│  http   │───▶│  security  │───▶│   routing    │   │
//!                              │  │ server  │    │rate limits │    │ route table  │   │
//!                              │  └─────────┘    └────────────┘    └──────┬───────┘   │
//!                              │                                          │           │
//!                              │                                          ▼           │
//!     Client Response          │  ┌─────────┐    ┌────────────┐    ┌──────────────┐   │
//!     ◀────────────────────────┼──│response │◀───│   proxy    │◀───│    target    │◀──┼──── Upstream
//!                              │  │ relay   │    │  executor  │    │  resolution  │   │     API
//!                              │  └─────────┘    └────────────┘    └──────────────┘   │
//!                              │                                                       │
//!                              │  ┌──────────────────────────────────────────────────┐ │
//!                              │  │              Cross-Cutting Concerns              │ │
//!                              │  │   ┌─────────┐  ┌──────────────┐  ┌───────────┐   │ │
//!                              │  │   │ config  │  │observability │  │ lifecycle │   │ │
//!                              │  │   └─────────┘  └──────────────┘  └───────────┘   │ │
//!                              │  └──────────────────────────────────────────────────┘ │
//!                              └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use api_gateway::config::load_config;
use api_gateway::http::HttpServer;
use api_gateway::lifecycle::{shutdown_signal, Shutdown};
use api_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "api-gateway")]
#[command(about = "Prefix-routing API gateway with rate limiting", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;

    if args.check_config {
        println!("Configuration OK ({} routes)", config.routes.len());
        return Ok(());
    }

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        "api-gateway starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        upstream_timeout_secs = config.timeouts.upstream_secs,
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

    let server = HttpServer::new(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
