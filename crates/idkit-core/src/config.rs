//! SDK configuration and publishable-key handling.

use base64::Engine;
use std::time::Duration;
use thiserror::Error;

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

const TEST_PREFIX: &str = "ik_test_";
const LIVE_PREFIX: &str = "ik_live_";

/// Environment class a publishable key targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceKind {
    Test,
    Live,
}

/// Errors from publishable-key parsing.
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("publishable key must start with {TEST_PREFIX} or {LIVE_PREFIX}")]
    MissingPrefix,
    #[error("publishable key payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("publishable key payload is not valid UTF-8")]
    Utf8,
    #[error("publishable key payload is empty")]
    Empty,
}

/// Derive the API base address from a publishable key.
///
/// The key embeds the backend instance host as base64 after the environment
/// prefix, with a trailing `$` marker: `ik_test_<base64("host$")>`.
pub fn derive_api_url(publishable_key: &str) -> Result<(String, InstanceKind), KeyError> {
    let (payload, kind) = if let Some(rest) = publishable_key.strip_prefix(TEST_PREFIX) {
        (rest, InstanceKind::Test)
    } else if let Some(rest) = publishable_key.strip_prefix(LIVE_PREFIX) {
        (rest, InstanceKind::Live)
    } else {
        return Err(KeyError::MissingPrefix);
    };

    let decoded = BASE64.decode(payload)?;
    let host = String::from_utf8(decoded).map_err(|_| KeyError::Utf8)?;
    let host = host.trim_end_matches('$');
    if host.is_empty() {
        return Err(KeyError::Empty);
    }

    Ok((format!("https://{}", host), kind))
}

/// Tunables for bootstrap, token refresh, and attestation behavior.
///
/// # Defaults
///
/// - `bootstrap_timeout`: 10s
/// - `attestation_backoff_base`: 5s
/// - `attestation_backoff_multiplier`: 2
/// - `max_attestation_retries`: 3
/// - `token_refresh_interval`: 50s
/// - `redirect_url`: `idkit://oauth-callback`
#[derive(Debug, Clone)]
pub struct SdkConfig {
    /// Single bound on the concurrent client+environment fetch.
    pub bootstrap_timeout: Duration,
    /// Base delay before the first attestation retry.
    pub attestation_backoff_base: Duration,
    /// Multiplier applied per attestation retry.
    pub attestation_backoff_multiplier: u32,
    /// Retries after the first attestation failure before giving up.
    pub max_attestation_retries: u32,
    /// Interval between session-token refreshes.
    pub token_refresh_interval: Duration,
    /// Cloud project id forwarded to the device attestor.
    pub attestation_cloud_project_id: Option<String>,
    /// Application id forwarded to the device attestor.
    pub attestation_app_id: Option<String>,
    /// Callback URL the browser redirects to after external verification.
    pub redirect_url: String,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            bootstrap_timeout: Duration::from_secs(10),
            attestation_backoff_base: Duration::from_secs(5),
            attestation_backoff_multiplier: 2,
            max_attestation_retries: 3,
            token_refresh_interval: Duration::from_secs(50),
            attestation_cloud_project_id: None,
            attestation_app_id: None,
            redirect_url: "idkit://oauth-callback".to_string(),
        }
    }
}
