//! Shutdown signal watcher

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vsphere_stream::Cancellation;

/// Cancel `cancel` on SIGINT or SIGTERM
///
/// The watcher does nothing else; the streaming side observes the token
/// and winds down on its own.
pub fn spawn_watcher(cancel: Cancellation) -> JoinHandle<()> {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => debug!("Received SIGINT"),
            _ = terminate => debug!("Received SIGTERM"),
        }

        info!("Exiting");
        cancel.cancel();
    })
}
