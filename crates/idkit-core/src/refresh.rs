//! Periodic session-token refresh.
//!
//! Session JWTs are short-lived, so a background task re-fetches the active
//! session's token on a fixed cadence, keeping the backend's token cache warm.
//! Fetch failures are logged and the loop keeps ticking; transient outages
//! must not kill the cadence.

use idkit_api::IdentityApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Handle to a running refresh loop. Dropping it closes the shutdown channel
/// and the loop exits on its own; [`shutdown`](Self::shutdown) additionally
/// waits for the task to drain.
pub(crate) struct RefreshLoopHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RefreshLoopHandle {
    /// Stop the loop and wait for the task to drain.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.task.await;
    }
}

/// Spawn the refresh loop against the shared active-session slot.
///
/// The loop reads the slot on every tick, so session changes take effect
/// without a restart; ticks with no active session are skipped.
pub(crate) fn spawn_token_refresh(
    api: Arc<dyn IdentityApi>,
    active_session: Arc<RwLock<Option<String>>>,
    interval: Duration,
) -> RefreshLoopHandle {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick of a tokio interval fires immediately; the token from
        // the refresh that started this loop is still fresh, so skip it.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    debug!("token refresh loop shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    let session_id = active_session.read().await.clone();
                    let Some(session_id) = session_id else {
                        debug!("no active session, skipping token refresh");
                        continue;
                    };
                    match api.fetch_token(&session_id, true).await {
                        Ok(_) => debug!(session_id = %session_id, "session token refreshed"),
                        Err(e) => {
                            warn!(error = %e, session_id = %session_id, "session token refresh failed")
                        }
                    }
                }
            }
        }
    });
    RefreshLoopHandle { shutdown_tx, task }
}
