//! fanmon daemon
//!
//! Watches tach sensors and presence lines, decides whether each fan is
//! present and functional, and publishes the verdicts to the inventory
//! store. A read-only REST API exposes the current state.
//!
//! # Tasks
//!
//! - **Poller**: reads bound hwmon attributes and emits bus events
//! - **Monitor**: applies events and timer expiries on a single task
//! - **Status API**: serves the snapshot the monitor publishes

mod api;
mod config;
mod error_log;
mod inventory;
mod manager;
mod poller;
mod service;
mod shutdown;

use anyhow::Result;
use api::AppState;
use clap::Parser;
use config::RuntimeConfig;
use error_log::ErrorLog;
use fanmon_core::{default_config_path, MonitorMode};
use fanmon_hardware::{HwmonTach, SysfsGpio};
use inventory::InventoryStore;
use manager::Manager;
use poller::Poller;
use service::MonitorService;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

/// Capacity of the bus event channel between poller and monitor
const EVENT_QUEUE_DEPTH: usize = 256;

/// fanmon daemon
#[derive(Parser, Debug)]
#[command(name = "fanmond")]
#[command(version, about = "Fan presence and health monitor", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fan definition file (overrides `fan_config` in the config file)
    #[arg(short, long)]
    fans: Option<PathBuf>,

    /// Monitor mode: `init` seeds sensor state from the inventory, `monitor` starts functional
    #[arg(short, long)]
    mode: Option<MonitorMode>,

    /// Server bind address
    #[arg(short, long)]
    bind: Option<String>,

    /// Server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(args.verbose);

    info!("fanmon daemon starting...");

    // Determine config path: CLI flag > env var > default
    let config_path = args.config.unwrap_or_else(|| {
        std::env::var("FANMON_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_path())
    });
    info!("Configuration file: {}", config_path.display());

    let runtime_config = match RuntimeConfig::load(&config_path, args.fans).await {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    let static_config = runtime_config.static_config();
    let mode = args.mode.unwrap_or(static_config.mode);
    info!("  Fan definitions: {}", static_config.fan_config.display());
    info!("  Data directory: {}", runtime_config.data_dir().display());

    let inventory = InventoryStore::load(runtime_config.data_dir()).await?;
    let errors = ErrorLog::load(runtime_config.data_dir()).await?;

    let manager = Manager::new(runtime_config.fans(), mode, SysfsGpio::new(), |path| {
        inventory.functional(path)
    });
    let service = MonitorService::new(manager, inventory, errors);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(shutdown::listen(shutdown_tx));

    // Poller
    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    let poller = Poller::new(HwmonTach::new(), runtime_config.fans());
    let tach_interval = Duration::from_millis(static_config.poll.tach_interval_ms);
    info!(
        "Polling {} tach bindings every {:?}",
        poller.binding_count(),
        tach_interval
    );
    let poller_handle = tokio::spawn(poller.run(event_tx, tach_interval));

    // Status API
    let bind = args
        .bind
        .unwrap_or_else(|| static_config.server.hostname.clone());
    let port = args.port.unwrap_or(static_config.server.port);
    let bind_addr = format!("{}:{}", bind, port);
    let app = api::create_router(AppState::new(service.snapshot()));
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Status API listening on {}", bind_addr);

    let server_shutdown = shutdown::requested(shutdown_rx.clone());
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(server_shutdown)
            .await
    });

    // Monitor loop runs on this task until shutdown
    let presence_interval = Duration::from_millis(static_config.poll.presence_interval_ms);
    service
        .run(
            event_rx,
            presence_interval,
            shutdown::requested(shutdown_rx),
        )
        .await;

    poller_handle.abort();
    server.await??;

    info!("fanmon daemon shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber for logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
