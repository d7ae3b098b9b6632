//! SDK bootstrap and session coordination.
//!
//! The [`Sdk`] is the single entry point hosts hold on to. `configure` runs
//! the initial refresh sequence (client and environment fetched concurrently
//! under one timeout) and, from its outcome, drives everything downstream:
//! the readiness watch channel, the persisted session artifacts, the token
//! refresh loop, and the attestation supervisor.

use crate::attestation::{spawn_attestation, AttestationState};
use crate::attestor::DeviceAttestor;
use crate::browser::BrowserLauncher;
use crate::config::{derive_api_url, KeyError, SdkConfig};
use crate::connect::ConnectionBridge;
use crate::redirect::RedirectBridge;
use crate::refresh::{spawn_token_refresh, RefreshLoopHandle};
use crate::storage::{SessionStore, CLIENT_ID_KEY, SESSION_ID_KEY};
use idkit_api::{FrontendApi, IdentityApi};
use idkit_types::{ApiResult, AuthOutcome, Client, Environment, ExternalAccount, OAuthProvider};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};

/// Readiness of the SDK as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadinessState {
    /// `configure` has not been called.
    #[default]
    NotConfigured,
    /// A refresh sequence is in flight.
    Bootstrapping,
    /// Client and environment snapshots are published and current.
    Ready,
    /// The last refresh sequence failed; any prior snapshot is still served.
    Failed,
}

struct SdkInner {
    config: SdkConfig,
    api: Arc<dyn IdentityApi>,
    attestor: Arc<dyn DeviceAttestor>,
    store: Arc<dyn SessionStore>,
    redirect: RedirectBridge,
    connect: ConnectionBridge,
    readiness_tx: watch::Sender<ReadinessState>,
    attestation_tx: Arc<watch::Sender<AttestationState>>,
    client: RwLock<Option<Client>>,
    environment: RwLock<Option<Environment>>,
    /// Shared with the refresh loop, which re-reads it on every tick.
    active_session: Arc<RwLock<Option<String>>>,
    refresh_loop: Mutex<Option<RefreshLoopHandle>>,
    /// Set once the store finished initializing; lifecycle refreshes wait on it.
    lifecycle_ready: AtomicBool,
}

/// Cheaply cloneable SDK handle.
#[derive(Clone)]
pub struct Sdk(Arc<SdkInner>);

impl Sdk {
    /// Build an SDK against the backend instance a publishable key encodes.
    pub fn new(
        publishable_key: &str,
        config: SdkConfig,
        launcher: Arc<dyn BrowserLauncher>,
        attestor: Arc<dyn DeviceAttestor>,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, KeyError> {
        let (base_url, kind) = derive_api_url(publishable_key)?;
        debug!(base_url = %base_url, instance = ?kind, "derived backend address");
        let api = Arc::new(FrontendApi::new(base_url, publishable_key));
        Ok(Self::with_api(api, config, launcher, attestor, store))
    }

    /// Build an SDK over an arbitrary [`IdentityApi`] implementation.
    pub fn with_api(
        api: Arc<dyn IdentityApi>,
        config: SdkConfig,
        launcher: Arc<dyn BrowserLauncher>,
        attestor: Arc<dyn DeviceAttestor>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let (readiness_tx, _) = watch::channel(ReadinessState::NotConfigured);
        let (attestation_tx, _) = watch::channel(AttestationState::Unknown);
        let redirect = RedirectBridge::new(api.clone(), launcher.clone(), &config.redirect_url);
        let connect = ConnectionBridge::new(api.clone(), launcher, &config.redirect_url);
        Self(Arc::new(SdkInner {
            config,
            api,
            attestor,
            store,
            redirect,
            connect,
            readiness_tx,
            attestation_tx: Arc::new(attestation_tx),
            client: RwLock::new(None),
            environment: RwLock::new(None),
            active_session: Arc::new(RwLock::new(None)),
            refresh_loop: Mutex::new(None),
            lifecycle_ready: AtomicBool::new(false),
        }))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Run the initial bootstrap. Idempotent: only the first call does work.
    pub async fn configure(&self) {
        let started = self.0.readiness_tx.send_if_modified(|state| {
            if *state == ReadinessState::NotConfigured {
                *state = ReadinessState::Bootstrapping;
                true
            } else {
                false
            }
        });
        if !started {
            warn!("configure called more than once, ignoring");
            return;
        }

        let inner = self.0.clone();
        tokio::spawn(async move {
            inner.store.initialize().await;
            inner.lifecycle_ready.store(true, Ordering::SeqCst);
        });

        self.run_refresh_sequence().await;
    }

    /// Refresh the snapshot when the host app returns to the foreground.
    ///
    /// Skipped until `configure` ran and the store finished initializing.
    pub async fn on_app_foreground(&self) {
        if !self.0.lifecycle_ready.load(Ordering::SeqCst) {
            debug!("store not initialized yet, skipping foreground refresh");
            return;
        }
        if *self.0.readiness_tx.borrow() == ReadinessState::NotConfigured {
            debug!("not configured, skipping foreground refresh");
            return;
        }
        self.run_refresh_sequence().await;
    }

    /// Drop the local session: stop the refresh loop, clear the active
    /// session and its persisted id, and cancel in-flight browser flows.
    pub async fn sign_out(&self) {
        let inner = &self.0;
        if let Some(handle) = inner.refresh_loop.lock().await.take() {
            handle.shutdown().await;
        }
        *inner.active_session.write().await = None;
        inner.store.remove(SESSION_ID_KEY);
        inner.redirect.cancel("signed out");
        inner.connect.cancel("signed out");
        info!("signed out");
    }

    /// Fetch client and environment concurrently under one timeout and
    /// publish the result atomically.
    ///
    /// On any failure the readiness lands on `Failed` and a previously
    /// published snapshot stays untouched; a half-updated snapshot is never
    /// observable.
    async fn run_refresh_sequence(&self) {
        let inner = &self.0;
        inner.readiness_tx.send_replace(ReadinessState::Bootstrapping);

        let fetches = async {
            tokio::join!(inner.api.fetch_client(), inner.api.fetch_environment())
        };
        match tokio::time::timeout(inner.config.bootstrap_timeout, fetches).await {
            Ok((Ok(client), Ok(environment))) => {
                self.publish_snapshot(client, environment).await;
            }
            Ok((client_result, environment_result)) => {
                if let Err(e) = &client_result {
                    warn!(error = %e, "client fetch failed during refresh sequence");
                }
                if let Err(e) = &environment_result {
                    warn!(error = %e, "environment fetch failed during refresh sequence");
                }
                inner.readiness_tx.send_replace(ReadinessState::Failed);
            }
            Err(_) => {
                warn!(
                    timeout_ms = inner.config.bootstrap_timeout.as_millis() as u64,
                    "refresh sequence timed out"
                );
                inner.readiness_tx.send_replace(ReadinessState::Failed);
            }
        }
    }

    async fn publish_snapshot(&self, client: Client, environment: Environment) {
        let inner = &self.0;

        inner.store.put(CLIENT_ID_KEY, &client.id);
        let session_id = client.active_session_id().map(str::to_string);
        match &session_id {
            Some(id) => inner.store.put(SESSION_ID_KEY, id),
            None => inner.store.remove(SESSION_ID_KEY),
        }

        let mode = environment.fraud_settings.device_attestation_mode;
        *inner.active_session.write().await = session_id.clone();
        *inner.client.write().await = Some(client);
        *inner.environment.write().await = Some(environment);
        inner.readiness_tx.send_replace(ReadinessState::Ready);
        info!(has_session = session_id.is_some(), "snapshot published");

        self.restart_refresh_loop(session_id.is_some()).await;
        let _ = spawn_attestation(
            inner.api.clone(),
            inner.attestor.clone(),
            inner.config.clone(),
            mode,
            inner.attestation_tx.clone(),
        );
    }

    async fn restart_refresh_loop(&self, has_session: bool) {
        let inner = &self.0;
        let mut guard = inner.refresh_loop.lock().await;
        if let Some(handle) = guard.take() {
            handle.shutdown().await;
        }
        if has_session {
            *guard = Some(spawn_token_refresh(
                inner.api.clone(),
                inner.active_session.clone(),
                inner.config.token_refresh_interval,
            ));
        }
    }

    // ========================================================================
    // Authentication flows
    // ========================================================================

    /// Redirect sign-in/sign-up via the platform browser.
    ///
    /// On success the snapshot is refreshed so the newly created session
    /// becomes the active one.
    pub async fn authenticate_with_redirect(
        &self,
        provider: OAuthProvider,
    ) -> ApiResult<AuthOutcome> {
        let outcome = self.0.redirect.authenticate_with_redirect(provider).await?;
        self.run_refresh_sequence().await;
        Ok(outcome)
    }

    /// Deliver the browser callback URI for a pending redirect sign-in.
    pub async fn on_oauth_callback(&self, callback_uri: &str) {
        self.0.redirect.complete_redirect(callback_uri).await;
    }

    /// Cancel a pending redirect sign-in, if any.
    pub fn cancel_pending_auth(&self, reason: &str) {
        self.0.redirect.cancel(reason);
    }

    /// Connect an external account to the signed-in user.
    pub async fn connect_external_account(
        &self,
        provider: OAuthProvider,
    ) -> ApiResult<ExternalAccount> {
        self.0.connect.connect(provider).await
    }

    /// Signal that the browser returned from an external-account flow.
    pub async fn on_connection_callback(&self) {
        self.0.connect.complete_connection().await;
    }

    // ========================================================================
    // Observers
    // ========================================================================

    pub fn readiness(&self) -> watch::Receiver<ReadinessState> {
        self.0.readiness_tx.subscribe()
    }

    pub fn attestation_state(&self) -> watch::Receiver<AttestationState> {
        self.0.attestation_tx.subscribe()
    }

    pub async fn client_snapshot(&self) -> Option<Client> {
        self.0.client.read().await.clone()
    }

    pub async fn environment_snapshot(&self) -> Option<Environment> {
        self.0.environment.read().await.clone()
    }

    pub async fn active_session_id(&self) -> Option<String> {
        self.0.active_session.read().await.clone()
    }
}
