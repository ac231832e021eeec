//! steam-proxy - JSON-RPC proxy for Steam leaderboard and Workshop queries
//!
//! Main entry point: `steam-proxy <port>`.
//!
//! # Overview
//!
//! The binary initializes:
//! - Configuration ([`ConfigManager`]): `steam-proxy.yaml` plus `STEAM_PROXY_*` overrides
//! - Logging infrastructure (file rotation + console output)
//! - The native session ([`NativeSession`]), whose polling thread owns the Steam client
//! - Tokio runtime serving the JSON-RPC listener ([`RpcServer`])
//!
//! # Execution Flow
//!
//! 1. Parse the port; wrong arguments print usage and exit with status 1
//! 2. Load configuration and initialize logging
//! 3. Bring the native client up; a startup failure exits with status 1
//! 4. Serve JSON-RPC until Ctrl-C
//! 5. Stop the listener, then the polling loop, and log the metrics summary

use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use steam_proxy::cli::{self, USAGE};
use steam_proxy::config::{CONFIG_FILE_NAME, ConfigSource};
use steam_proxy::services::SessionSettings;
use steam_proxy::{
    APP_NAME, ConfigManager, Metrics, NativeSession, PlatformSnapshot, ProxyConfig, ProxyService,
    RpcServer, SnapshotClient, VERSION,
};

fn main() -> ExitCode {
    let port = match cli::parse_port(std::env::args().skip(1)) {
        Ok(port) => port,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", USAGE);
            return ExitCode::FAILURE;
        }
    };

    match run(port) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Fatal: {:#}", e);
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(port: u16) -> Result<()> {
    let config_manager = ConfigManager::from_env()?;
    let config = config_manager.load_config()?;

    let _guard = steam_proxy::logging::setup_logging(&config.logging)?;
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    match config_manager.source() {
        ConfigSource::File(path) => tracing::info!("Loaded config from {}", path),
        ConfigSource::Defaults => tracing::warn!(
            "Config file not found at {}, using defaults",
            config_manager.config_path()
        ),
    }

    let metrics = Arc::new(Metrics::new());
    let session = start_session(&config, metrics.clone())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("steam-proxy-worker")
        .build()
        .context("Failed to create tokio runtime")?;

    let service = ProxyService::new(session.handle(), metrics.clone());
    let result = runtime.block_on(async {
        let server = RpcServer::bind(&config.server, port, service, metrics.clone())
            .await
            .with_context(|| format!("Failed to listen on port {}", port))?;

        server
            .run(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
                tracing::info!("Ctrl-C received, shutting down");
            })
            .await
            .context("JSON-RPC server failed")
    });

    runtime.shutdown_timeout(Duration::from_secs(5));
    session.shutdown();
    metrics.log_summary();

    tracing::info!("Shutdown complete");
    result
}

fn start_session(config: &ProxyConfig, metrics: Arc<Metrics>) -> Result<NativeSession> {
    let snapshot_path = config
        .steam
        .snapshot
        .as_deref()
        .with_context(|| {
            format!(
                "steam.snapshot is not configured (set it in {} or STEAM_PROXY_STEAM__SNAPSHOT)",
                CONFIG_FILE_NAME
            )
        })?;

    let snapshot = PlatformSnapshot::load(snapshot_path)?;
    let session = NativeSession::start(
        SnapshotClient::new(snapshot),
        SessionSettings::from(&config.steam),
        metrics,
    )?;
    Ok(session)
}
