//! Solo Audio Player (solo-ap) - Main entry point
//!
//! Loads configuration, starts the playback service on its own thread and
//! serves the HTTP control surface until Ctrl+C or SIGTERM.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use solo_ap::backend::build_backend;
use solo_ap::config::{Args, Config};
use solo_ap::{build_router, AppContext, PlayerService};
use solo_common::config::{load_or_default, CompiledDefaults};
use solo_common::EventBus;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is loaded before logging so the configured level applies
    let (toml_config, config_source) =
        load_or_default(args.config.as_deref()).context("Failed to load config")?;
    let config = Config::resolve(
        &args,
        &toml_config,
        &CompiledDefaults::for_current_platform(),
    );

    let level = &config.log_level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "solo_ap={level},solo_common={level},tower_http={level}",
                    level = level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Solo Audio Player (solo-ap) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match &config_source {
        Some(path) => info!("Config loaded from {}", path.display()),
        None => warn!("No config file found, using compiled defaults"),
    }
    info!("Library root: {}", config.library_root.display());
    if !config.library_root.is_dir() {
        warn!(
            "Library root {} does not exist; every play request will fail until it does",
            config.library_root.display()
        );
    }

    let backend = build_backend(&config);
    let backend_name = backend.name();
    info!("Media backend: {}", backend_name);

    let events = EventBus::new(config.event_capacity);
    let (player, service_thread) = PlayerService::spawn(backend, events.clone())
        .context("Failed to start playback service")?;

    let app = build_router(AppContext {
        player: player.clone(),
        events,
        backend: backend_name,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Release the active handle before exiting
    player.shutdown();
    tokio::task::spawn_blocking(move || service_thread.join())
        .await
        .context("Failed to wait for playback service")?
        .map_err(|_| anyhow::anyhow!("Playback service thread panicked"))?;

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
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
