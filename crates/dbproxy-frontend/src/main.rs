//! dbproxy-frontend - standalone MySQL-compatible authentication front-end
//!
//! Loads users and schemas from a YAML file, listens for clients and reloads
//! both registries on SIGHUP.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use dbproxy_frontend::{
    config, AuthenticationHandler, Listener, NativePasswordAuthenticationHandler, Result,
    SchemaRegistry, SchemaResolver, SchemaSnapshot, UserRegistry,
};

#[derive(Parser)]
#[command(name = "dbproxy-frontend")]
#[command(version)]
#[command(about = "MySQL-compatible authentication front-end for a database proxy")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Override listen address
    #[arg(long)]
    listen_address: Option<String>,

    /// Override listen port
    #[arg(long)]
    listen_port: Option<u16>,

    /// Enable verbose/debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::load_config(&cli.config)?;

    // Priority: --verbose flag, then RUST_LOG env var, then config level
    let log_level = if cli.verbose {
        "debug".to_string()
    } else if let Ok(filter) = std::env::var("RUST_LOG") {
        filter
    } else if config.logging.protocol_debug {
        format!("{},dbproxy_frontend=trace", config.logging.level)
    } else {
        config.logging.level.clone()
    };
    tracing_subscriber::fmt().with_env_filter(&log_level).init();

    info!("Starting dbproxy-frontend v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration from {:?}", cli.config);

    // Apply CLI overrides
    if let Some(addr) = cli.listen_address {
        config.server.listen_address = addr;
    }
    if let Some(port) = cli.listen_port {
        config.server.listen_port = port;
    }

    let config = Arc::new(config);
    let schemas = Arc::new(SchemaRegistry::from_config(&config));
    let users = Arc::new(UserRegistry::from_config(&config));
    let handler: Arc<dyn AuthenticationHandler> =
        Arc::new(NativePasswordAuthenticationHandler::new(Arc::clone(&users)));
    let resolver: Arc<dyn SchemaResolver> = schemas.clone();

    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    let listener = Listener::bind(Arc::clone(&config), handler, resolver, shutdown_rx).await?;
    let stats = listener.stats();

    info!(
        "Front-end ready: listening on {}:{} ({} users, {} schemas)",
        config.server.listen_address,
        config.server.listen_port,
        users.len(),
        schemas.snapshot().len()
    );

    let listener_handle = tokio::spawn(async move {
        if let Err(e) = listener.run().await {
            error!("Listener error: {}", e);
        }
    });

    wait_for_shutdown(&cli.config, &schemas, &users).await?;

    let _ = shutdown_tx.send(());
    let _ = listener_handle.await;

    info!(
        "Shutdown complete. Total connections handled: {}",
        stats
            .connections_accepted
            .load(std::sync::atomic::Ordering::Relaxed)
    );

    Ok(())
}

/// Re-read the configuration file and swap in new users and schemas.
///
/// Listener settings are not reloaded; a failed reload keeps the current
/// registries.
#[cfg_attr(not(unix), allow(dead_code))]
fn reload(path: &Path, schemas: &SchemaRegistry, users: &UserRegistry) {
    match config::load_config(path) {
        Ok(config) => {
            users.reload(UserRegistry::users_from_config(&config));
            let generation = schemas.reload(SchemaSnapshot::from_config(&config));
            info!(generation, "Configuration reloaded from {:?}", path);
        }
        Err(e) => warn!("Configuration reload failed, keeping current settings: {}", e),
    }
}

#[cfg(unix)]
async fn wait_for_shutdown(
    path: &Path,
    schemas: &SchemaRegistry,
    users: &UserRegistry,
) -> Result<()> {
    use signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, initiating shutdown...");
                return Ok(());
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating shutdown...");
                return Ok(());
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading configuration");
                reload(path, schemas, users);
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(
    _path: &Path,
    _schemas: &SchemaRegistry,
    _users: &UserRegistry,
) -> Result<()> {
    signal::ctrl_c().await?;
    info!("Received Ctrl+C, initiating shutdown...");
    Ok(())
}
