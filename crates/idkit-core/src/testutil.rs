//! Shared test doubles for the orchestration layer.

use crate::attestor::DeviceAttestor;
use crate::browser::BrowserLauncher;
use async_trait::async_trait;
use idkit_api::IdentityApi;
use idkit_types::{
    ApiResult, AttestationMode, Client, Environment, ExternalAccount, FraudSettings, Session,
    SessionStatus, SessionToken, SignIn, SignInStatus, SignUp, SignUpStatus, User, Verification,
    VerificationStatus,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Sample resources
// ============================================================================

pub(crate) fn sample_client() -> Client {
    Client {
        id: "client_1".to_string(),
        sessions: vec![Session {
            id: "sess_1".to_string(),
            status: SessionStatus::Active,
            user: Some(User {
                id: "user_1".to_string(),
                external_accounts: vec![],
            }),
        }],
        last_active_session_id: Some("sess_1".to_string()),
    }
}

pub(crate) fn client_without_session() -> Client {
    Client {
        id: "client_1".to_string(),
        sessions: vec![],
        last_active_session_id: None,
    }
}

pub(crate) fn client_with_account(account: ExternalAccount) -> Client {
    let mut client = sample_client();
    client.sessions[0]
        .user
        .as_mut()
        .expect("sample client has a user")
        .external_accounts
        .push(account);
    client
}

pub(crate) fn sample_environment(mode: AttestationMode) -> Environment {
    Environment {
        fraud_settings: FraudSettings {
            device_attestation_mode: mode,
        },
    }
}

pub(crate) fn redirect_sign_in(id: &str, url: Option<&str>) -> SignIn {
    SignIn {
        id: id.to_string(),
        status: SignInStatus::NeedsFirstFactor,
        first_factor_verification: Some(Verification {
            status: VerificationStatus::Unverified,
            external_verification_redirect_url: url.map(str::to_string),
            error: None,
        }),
        created_session_id: None,
    }
}

pub(crate) fn complete_sign_in(id: &str) -> SignIn {
    SignIn {
        id: id.to_string(),
        status: SignInStatus::Complete,
        first_factor_verification: None,
        created_session_id: Some("sess_new".to_string()),
    }
}

pub(crate) fn sample_sign_up(id: &str) -> SignUp {
    SignUp {
        id: id.to_string(),
        status: SignUpStatus::Complete,
        created_session_id: Some("sess_new".to_string()),
    }
}

pub(crate) fn account_with_status(
    id: &str,
    provider: &str,
    status: VerificationStatus,
    url: Option<&str>,
) -> ExternalAccount {
    ExternalAccount {
        id: id.to_string(),
        provider: provider.to_string(),
        verification: Some(Verification {
            status,
            external_verification_redirect_url: url.map(str::to_string),
            error: None,
        }),
    }
}

// ============================================================================
// MockApi
// ============================================================================

/// Scriptable in-memory [`IdentityApi`] with per-method call counters.
pub(crate) struct MockApi {
    pub client: Mutex<ApiResult<Client>>,
    pub environment: Mutex<ApiResult<Environment>>,
    pub created_sign_in: Mutex<ApiResult<SignIn>>,
    pub fetched_sign_in: Mutex<ApiResult<SignIn>>,
    pub sign_up: Mutex<ApiResult<SignUp>>,
    pub external_account: Mutex<ApiResult<ExternalAccount>>,
    pub token: Mutex<ApiResult<SessionToken>>,
    pub attestation: Mutex<ApiResult<()>>,
    /// Artificial delay applied to client/environment fetches.
    pub fetch_delay: Mutex<Option<Duration>>,

    pub client_fetches: AtomicUsize,
    pub environment_fetches: AtomicUsize,
    pub sign_in_creates: AtomicUsize,
    pub sign_in_fetches: AtomicUsize,
    pub last_sign_in_fetch: Mutex<Option<(String, Option<String>)>>,
    pub transfers: AtomicUsize,
    pub account_creates: AtomicUsize,
    pub token_fetches: AtomicUsize,
    pub last_token_fetch: Mutex<Option<(String, bool)>>,
    pub attestation_verifies: AtomicUsize,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            client: Mutex::new(Ok(sample_client())),
            environment: Mutex::new(Ok(sample_environment(AttestationMode::Disabled))),
            created_sign_in: Mutex::new(Ok(redirect_sign_in(
                "si_1",
                Some("https://accounts.example.com/oauth/start"),
            ))),
            fetched_sign_in: Mutex::new(Ok(complete_sign_in("si_1"))),
            sign_up: Mutex::new(Ok(sample_sign_up("su_1"))),
            external_account: Mutex::new(Ok(account_with_status(
                "eac_1",
                "oauth_google",
                VerificationStatus::Unverified,
                Some("https://accounts.example.com/oauth/connect"),
            ))),
            token: Mutex::new(Ok(SessionToken {
                jwt: "jwt-1".to_string(),
            })),
            attestation: Mutex::new(Ok(())),
            fetch_delay: Mutex::new(None),
            client_fetches: AtomicUsize::new(0),
            environment_fetches: AtomicUsize::new(0),
            sign_in_creates: AtomicUsize::new(0),
            sign_in_fetches: AtomicUsize::new(0),
            last_sign_in_fetch: Mutex::new(None),
            transfers: AtomicUsize::new(0),
            account_creates: AtomicUsize::new(0),
            token_fetches: AtomicUsize::new(0),
            last_token_fetch: Mutex::new(None),
            attestation_verifies: AtomicUsize::new(0),
        }
    }

    async fn apply_fetch_delay(&self) {
        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl IdentityApi for MockApi {
    async fn fetch_client(&self) -> ApiResult<Client> {
        self.client_fetches.fetch_add(1, Ordering::SeqCst);
        self.apply_fetch_delay().await;
        self.client.lock().unwrap().clone()
    }

    async fn fetch_environment(&self) -> ApiResult<Environment> {
        self.environment_fetches.fetch_add(1, Ordering::SeqCst);
        self.apply_fetch_delay().await;
        self.environment.lock().unwrap().clone()
    }

    async fn create_sign_in_with_redirect(
        &self,
        _strategy: &str,
        _redirect_url: &str,
    ) -> ApiResult<SignIn> {
        self.sign_in_creates.fetch_add(1, Ordering::SeqCst);
        self.created_sign_in.lock().unwrap().clone()
    }

    async fn fetch_sign_in(
        &self,
        sign_in_id: &str,
        rotating_token_nonce: Option<&str>,
    ) -> ApiResult<SignIn> {
        self.sign_in_fetches.fetch_add(1, Ordering::SeqCst);
        *self.last_sign_in_fetch.lock().unwrap() = Some((
            sign_in_id.to_string(),
            rotating_token_nonce.map(str::to_string),
        ));
        self.fetched_sign_in.lock().unwrap().clone()
    }

    async fn create_sign_up_transfer(&self) -> ApiResult<SignUp> {
        self.transfers.fetch_add(1, Ordering::SeqCst);
        self.sign_up.lock().unwrap().clone()
    }

    async fn create_external_account(
        &self,
        _strategy: &str,
        _redirect_url: &str,
    ) -> ApiResult<ExternalAccount> {
        self.account_creates.fetch_add(1, Ordering::SeqCst);
        self.external_account.lock().unwrap().clone()
    }

    async fn fetch_token(&self, session_id: &str, skip_cache: bool) -> ApiResult<SessionToken> {
        self.token_fetches.fetch_add(1, Ordering::SeqCst);
        *self.last_token_fetch.lock().unwrap() = Some((session_id.to_string(), skip_cache));
        self.token.lock().unwrap().clone()
    }

    async fn verify_attestation(&self, _token: &str) -> ApiResult<()> {
        self.attestation_verifies.fetch_add(1, Ordering::SeqCst);
        self.attestation.lock().unwrap().clone()
    }
}

// ============================================================================
// Launcher and attestor doubles
// ============================================================================

/// Records launched URLs instead of opening a browser.
pub(crate) struct RecordingLauncher {
    pub urls: Mutex<Vec<String>>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self {
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn launched(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    /// Poll until the bridge hands a URL to the launcher.
    pub async fn wait_for_launch(&self) -> String {
        for _ in 0..500 {
            if let Some(url) = self.urls.lock().unwrap().first().cloned() {
                return url;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("browser was never launched");
    }
}

impl BrowserLauncher for RecordingLauncher {
    fn launch(&self, url: &str) {
        self.urls.lock().unwrap().push(url.to_string());
    }
}

/// Returns a fixed integrity-token result and counts calls.
pub(crate) struct ScriptedAttestor {
    pub calls: AtomicUsize,
    pub result: Mutex<Result<String, String>>,
}

impl ScriptedAttestor {
    pub fn ok() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            result: Mutex::new(Ok("integrity-token".to_string())),
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            result: Mutex::new(Err("integrity service unavailable".to_string())),
        }
    }
}

#[async_trait]
impl DeviceAttestor for ScriptedAttestor {
    async fn integrity_token(
        &self,
        _cloud_project_id: Option<&str>,
        _app_id: Option<&str>,
    ) -> Result<String, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.lock().unwrap().clone()
    }
}
