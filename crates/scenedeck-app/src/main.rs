//! # scenedeck
//!
//! SceneDeck binary: wires the settings, data store, OBS supervisor and HTTP
//! server together (`serve`), or follows a running server the way the
//! dashboard does (`watch`).

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scenedeck_dashboard::poller::DEFAULT_POLL_PERIOD;
use scenedeck_dashboard::listener::DEFAULT_RETRY_DELAY;
use scenedeck_dashboard::{DashboardState, DeckClient, EventListener, SharedState, StatusPoller};
use scenedeck_obs::{ConnectionSupervisor, WsConnector};
use scenedeck_server::config::ServerConfig;
use scenedeck_server::server::DeckServer;
use scenedeck_settings::DeckSettings;
use scenedeck_store::DataStore;
use tokio_util::sync::CancellationToken;

/// OBS scene-switching dashboard.
#[derive(Parser, Debug)]
#[command(name = "scenedeck", version, about = "OBS scene-switching dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the dashboard and API (default).
    Serve(ServeArgs),
    /// Follow a running server and log connection and highlight changes.
    Watch(WatchArgs),
}

#[derive(clap::Args, Debug, Default)]
struct ServeArgs {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (default: `$SCENEDECK_CONFIG` or `./scenedeck.json`).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct WatchArgs {
    /// Base URL of the SceneDeck server.
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Log level filter.
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Load settings and apply CLI overrides.
fn resolve_settings(args: &ServeArgs) -> Result<DeckSettings> {
    let path = args
        .config
        .clone()
        .unwrap_or_else(scenedeck_settings::settings_path);
    let mut settings = scenedeck_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    if let Some(host) = &args.host {
        settings.server.host.clone_from(host);
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    Ok(settings)
}

async fn serve(args: ServeArgs) -> Result<()> {
    let settings = resolve_settings(&args)?;
    scenedeck_core::logging::init_subscriber(&settings.logging.level);

    let store = DataStore::open(settings.data.path()).with_context(|| {
        format!("Failed to open data directory {}", settings.data.dir)
    })?;

    let connector = Arc::new(WsConnector::new(
        settings.obs.handshake_timeout(),
        settings.obs.request_timeout(),
    ));
    let supervisor = ConnectionSupervisor::new(
        settings.obs.url.clone(),
        connector,
        Arc::new(store.settings.clone()),
        settings.obs.reconnect_interval(),
    );

    let server = DeckServer::new(ServerConfig::from_settings(&settings), supervisor.clone(), store);
    let bridge = server.spawn_event_bridge();

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("SceneDeck listening on http://{addr}");

    // an unreachable OBS at startup is not fatal
    if supervisor.connect().await.is_err() {
        let _ = supervisor.start_reconnecting();
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    supervisor.disconnect().await;
    server
        .shutdown()
        .graceful_shutdown(vec![handle, bridge], None)
        .await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn watch(args: WatchArgs) -> Result<()> {
    scenedeck_core::logging::init_subscriber(&args.log_level);

    let client = DeckClient::new(&args.url, Duration::from_secs(10))
        .context("Failed to build HTTP client")?;
    let state = SharedState::new(DashboardState::default());
    match client.buttons().await {
        Ok(buttons) => {
            let _ = state.set_buttons(buttons);
        }
        Err(e) => tracing::warn!(error = %e, url = %args.url, "failed to load buttons"),
    }

    let cancel = CancellationToken::new();
    let poller = StatusPoller::new(client.clone(), state.clone(), DEFAULT_POLL_PERIOD);
    let listener = EventListener::new(client, state.clone(), DEFAULT_RETRY_DELAY);
    let poller_task = tokio::spawn(poller.run(cancel.clone()));
    let listener_task = tokio::spawn(listener.run(cancel.clone()));

    let mut changes = state.watch();
    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = changes.borrow_and_update().clone();
                tracing::info!(
                    indicator = ?snapshot.indicator(),
                    scene = snapshot.current_scene().unwrap_or("-"),
                    highlighted = ?snapshot.highlighted(),
                    favorites = ?snapshot.favorites_highlighted(),
                    "dashboard updated"
                );
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for ctrl-c")?;
                break;
            }
        }
    }

    cancel.cancel();
    let _ = tokio::join!(poller_task, listener_task);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => serve(args).await,
        Command::Watch(args) => watch(args).await,
    }
}
