//! TapCoach practice engine - main entry point
//!
//! Loads the bootstrap configuration, starts the control loop and serves the
//! companion app over HTTP/WebSocket until Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tapcoach_common::config::TomlConfig;
use tapcoach_engine::api::{self, AppContext};
use tapcoach_engine::control_loop::{ControlLoop, LoopClock};
use tapcoach_engine::hardware::{LogIndicators, VirtualPads};
use tapcoach_engine::notifier::EventBroadcaster;
use tapcoach_engine::session::SessionController;
use tapcoach_engine::SharedState;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for tapcoach-engine
#[derive(Parser, Debug)]
#[command(name = "tapcoach-engine")]
#[command(about = "Real-time drum practice coach")]
#[command(version)]
struct Args {
    /// Bootstrap TOML file
    #[arg(short, long, env = "TAPCOACH_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "TAPCOACH_PORT")]
    port: Option<u16>,

    /// Interface to bind (overrides the config file)
    #[arg(long)]
    host: Option<String>,
}

const EVENT_BUFFER: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, source) =
        TomlConfig::load_resolved(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(host) = args.host {
        config.host = host;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting TapCoach engine v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &source {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }

    let clock = LoopClock::new();
    let events = EventBroadcaster::new(EVENT_BUFFER);
    let pads = Arc::new(VirtualPads::new(clock, config.sensors.virtual_pulse_ms));
    let indicators = Arc::new(LogIndicators::new());

    let controller = SessionController::from_config(&config, Arc::new(events.clone()), indicators)
        .context("Failed to initialize session controller")?;
    info!(
        "Rhythm catalog: {}",
        controller
            .catalog()
            .variants()
            .iter()
            .map(|v| v.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let state = Arc::new(SharedState::new(controller.snapshot()));
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

    let control_loop = ControlLoop::new(
        controller,
        inbound_rx,
        pads.clone(),
        state.clone(),
        clock,
        Duration::from_millis(config.timing.loop_interval_ms),
    );

    let cancel = CancellationToken::new();
    let loop_handle = tokio::spawn(control_loop.run(cancel.clone()));

    let ctx = AppContext {
        state,
        events,
        inbound: inbound_tx,
        pads,
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.host, config.port))?;

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.cancel();
    });

    api::run(addr, ctx, cancel.clone()).await.context("Server error")?;

    cancel.cancel();
    loop_handle.await.context("Control loop panicked")?;

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
