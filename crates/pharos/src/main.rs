//! # pharos
//!
//! Guidance engine server binary — wires an engine, the evaluation service,
//! and the HTTP/WebSocket server together.
//!
//! The binary starts with an empty strategy set; embedders construct their
//! own engine via the library crates and register strategies in code. The
//! control surface (state updates, callbacks, start/stop, observer channels)
//! is fully functional either way.

#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pharos_engine::{ContextStore, GuidanceEngine, GuidanceService, Passthrough, TickConfig};
use pharos_server::{GuidanceServer, ServerConfig};

/// Pharos guidance engine server.
#[derive(Parser, Debug)]
#[command(name = "pharos", about = "Pharos guidance engine server")]
struct Cli {
    /// Host to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind.
    #[arg(long, default_value = "8000")]
    port: u16,

    /// Seconds between conditional-action evaluation passes.
    #[arg(long, default_value = "2")]
    action_interval: u64,

    /// Seconds between strategy applicability passes.
    #[arg(long, default_value = "30")]
    strategy_interval: u64,

    /// Begin periodic evaluation immediately instead of waiting for `/start`.
    #[arg(long)]
    autostart: bool,

    /// Log level when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    pharos_core::logging::init_subscriber(&args.log_level);

    let engine = GuidanceEngine::new(Vec::new(), Arc::new(Passthrough), ContextStore::new());
    let service = Arc::new(GuidanceService::new(
        engine,
        TickConfig::from_secs(args.action_interval, args.strategy_interval),
    ));

    if args.autostart {
        service
            .start()
            .context("failed to start evaluation loops")?;
        tracing::info!("evaluation loops started (autostart)");
    }

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        ..ServerConfig::default()
    };
    let server = GuidanceServer::with_service(config, service.clone());
    let bridge = server.spawn_bridge();

    let listener = tokio::net::TcpListener::bind(server.config().bind_addr())
        .await
        .context("failed to bind server")?;
    let addr = listener.local_addr().context("failed to read bind addr")?;
    tracing::info!("pharos listening on http://{addr}");

    axum::serve(listener, server.router())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shutting down");
    if service.is_running() {
        let _ = service.stop().await;
    }
    if let Some(handle) = bridge {
        handle.abort();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["pharos"]);
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.port, 8000);
        assert_eq!(cli.action_interval, 2);
        assert_eq!(cli.strategy_interval, 30);
        assert!(!cli.autostart);
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn cli_custom_values() {
        let cli = Cli::parse_from([
            "pharos",
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
            "--action-interval",
            "1",
            "--strategy-interval",
            "10",
            "--autostart",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.host, "0.0.0.0");
        assert_eq!(cli.port, 9000);
        assert_eq!(cli.action_interval, 1);
        assert_eq!(cli.strategy_interval, 10);
        assert!(cli.autostart);
        assert_eq!(cli.log_level, "debug");
    }
}
