//! Device attestation supervisor.
//!
//! When the environment asks for attestation, a background task obtains a
//! platform integrity token and submits it for verification, retrying with
//! bounded exponential backoff. Progress is broadcast on a watch channel so
//! the host can render attestation state without polling.

use crate::attestor::DeviceAttestor;
use crate::config::SdkConfig;
use idkit_api::IdentityApi;
use idkit_types::AttestationMode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Where the device stands with attestation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttestationState {
    /// No attestation has been attempted yet.
    #[default]
    Unknown,
    /// A supervisor task is running.
    InProgress,
    /// The backend accepted an integrity token.
    Attested,
    /// All attempts failed; `retries` is the number of retries spent.
    Failed { retries: u32 },
}

/// Delay before retry number `attempt + 1`.
pub(crate) fn compute_backoff(base: Duration, multiplier: u32, attempt: u32) -> Duration {
    let factor = multiplier.checked_pow(attempt).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}

async fn attempt_attestation(
    api: &Arc<dyn IdentityApi>,
    attestor: &Arc<dyn DeviceAttestor>,
    config: &SdkConfig,
) -> Result<(), String> {
    let token = attestor
        .integrity_token(
            config.attestation_cloud_project_id.as_deref(),
            config.attestation_app_id.as_deref(),
        )
        .await?;
    api.verify_attestation(&token)
        .await
        .map_err(|e| e.to_string())
}

/// Start the attestation supervisor, if the environment calls for one.
///
/// Returns `None` without spawning when the mode is `Disabled` or a
/// supervisor is already running. Attestation failures are terminal for the
/// task but never fatal for the session: the state lands on `Failed` and the
/// rest of the stack keeps going.
pub(crate) fn spawn_attestation(
    api: Arc<dyn IdentityApi>,
    attestor: Arc<dyn DeviceAttestor>,
    config: SdkConfig,
    mode: AttestationMode,
    state_tx: Arc<watch::Sender<AttestationState>>,
) -> Option<JoinHandle<()>> {
    if mode == AttestationMode::Disabled {
        debug!("device attestation disabled for this environment");
        return None;
    }
    // send_if_modified doubles as the single-supervisor guard: if the state
    // is already InProgress another task owns the retry loop.
    let started = state_tx.send_if_modified(|state| {
        if *state == AttestationState::InProgress {
            false
        } else {
            *state = AttestationState::InProgress;
            true
        }
    });
    if !started {
        debug!("attestation already in progress, not starting another supervisor");
        return None;
    }

    Some(tokio::spawn(async move {
        let max_retries = config.max_attestation_retries;
        for attempt in 0..=max_retries {
            match attempt_attestation(&api, &attestor, &config).await {
                Ok(()) => {
                    info!(attempt, "device attestation verified");
                    let _ = state_tx.send(AttestationState::Attested);
                    return;
                }
                Err(e) if attempt == max_retries => {
                    warn!(error = %e, retries = max_retries, "device attestation gave up");
                    let _ = state_tx.send(AttestationState::Failed {
                        retries: max_retries,
                    });
                    return;
                }
                Err(e) => {
                    let delay = compute_backoff(
                        config.attestation_backoff_base,
                        config.attestation_backoff_multiplier,
                        attempt,
                    );
                    warn!(error = %e, attempt, delay_ms = delay.as_millis() as u64, "attestation attempt failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }))
}
