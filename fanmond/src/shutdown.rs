//! Shutdown handling for graceful daemon termination
//!
//! A single signal listener fans out to the status server and the monitor
//! loop through a watch channel. The monitor flushes the inventory
//! snapshot on its way out so published state survives a restart.

use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::inventory::InventoryStore;

/// Wait for Ctrl+C or SIGTERM, then notify every subscriber
pub async fn listen(tx: watch::Sender<bool>) {
    shutdown_signal().await;
    let _ = tx.send(true);
}

/// Resolve once shutdown has been requested
pub async fn requested(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Write out any inventory changes not yet saved
pub async fn flush_inventory(inventory: &mut InventoryStore) {
    match inventory.save().await {
        Ok(()) => info!("Inventory flushed"),
        Err(e) => warn!("Failed to flush inventory on shutdown: {}", e),
    }
}

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
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
