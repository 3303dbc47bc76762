//! Utility functions.

use std::future::Future;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{info, warn};

/// Resolve when the process receives Ctrl-C.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}

/// Wait for a background task, flipping `cancel` if `shutdown` resolves first.
///
/// The task is always joined, so a cancelled task still gets to finish its
/// current request.
pub async fn join_or_cancel<T, F>(
    mut task: JoinHandle<T>,
    shutdown: F,
    cancel: &watch::Sender<bool>,
) -> Result<T, JoinError>
where
    F: Future<Output = ()>,
{
    tokio::select! {
        joined = &mut task => joined,
        _ = shutdown => {
            info!("Cancelling background task");
            let _ = cancel.send(true);
            task.await
        }
    }
}

/// Shorten an id for display.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}
