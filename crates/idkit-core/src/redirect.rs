//! Browser redirect bridge for sign-in and sign-up.
//!
//! `authenticate_with_redirect` creates a sign-in attempt, opens the external
//! verification URL in the platform browser, and suspends on a pending
//! operation. When the platform delivers the callback URI, `complete_redirect`
//! inspects it and finishes the flow: a `rotating_token_nonce` query parameter
//! means the attempt completed as a sign-in, its absence means the account
//! belongs to a different flow and is transferred to a sign-up.

use crate::browser::BrowserLauncher;
use crate::pending::PendingOperations;
use idkit_api::IdentityApi;
use idkit_types::{ApiError, ApiResult, AuthOutcome, OAuthProvider};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use url::Url;

const NONCE_PARAM: &str = "rotating_token_nonce";

struct InFlight {
    correlation_id: String,
    sign_in_id: String,
}

/// Orchestrates the browser round-trip for redirect authentication.
pub struct RedirectBridge {
    api: Arc<dyn IdentityApi>,
    launcher: Arc<dyn BrowserLauncher>,
    redirect_url: String,
    pending: PendingOperations<AuthOutcome>,
    /// Sign-in attempt the pending operation belongs to.
    in_flight: Mutex<Option<InFlight>>,
}

impl RedirectBridge {
    pub fn new(
        api: Arc<dyn IdentityApi>,
        launcher: Arc<dyn BrowserLauncher>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            api,
            launcher,
            redirect_url: redirect_url.into(),
            pending: PendingOperations::new("redirect"),
            in_flight: Mutex::new(None),
        }
    }

    /// Start a redirect sign-in and wait for the callback to complete it.
    ///
    /// Supersedes any operation already in flight. Resolves with the final
    /// [`AuthOutcome`] once [`complete_redirect`](Self::complete_redirect)
    /// receives the callback URI, or with `Cancelled` if a newer flow takes
    /// over first.
    pub async fn authenticate_with_redirect(
        &self,
        provider: OAuthProvider,
    ) -> ApiResult<AuthOutcome> {
        let correlation_id = uuid::Uuid::new_v4().to_string();
        let rx = self.pending.begin(correlation_id.clone());
        *self.in_flight.lock().expect("lock poisoned") = None;

        let sign_in = match self
            .api
            .create_sign_in_with_redirect(&provider.strategy(), &self.redirect_url)
            .await
        {
            Ok(sign_in) => sign_in,
            Err(e) => {
                self.pending.resolve_for(&correlation_id, Err(e.clone()));
                return Err(e);
            }
        };

        let url = sign_in
            .first_factor_verification
            .as_ref()
            .and_then(|v| v.external_verification_redirect_url.clone());
        let url = match url {
            Some(url) => url,
            None => {
                let e = ApiError::unknown(format!(
                    "sign-in {} has no external verification redirect URL",
                    sign_in.id
                ));
                self.pending.resolve_for(&correlation_id, Err(e.clone()));
                return Err(e);
            }
        };

        // Only publish the attempt if this flow still owns the slot; a
        // concurrent begin may have superseded it while we were on the wire.
        if self.pending.current_id().as_deref() == Some(correlation_id.as_str()) {
            *self.in_flight.lock().expect("lock poisoned") = Some(InFlight {
                correlation_id: correlation_id.clone(),
                sign_in_id: sign_in.id.clone(),
            });
            debug!(sign_in_id = %sign_in.id, "launching external verification");
            self.launcher.launch(&url);
        }

        rx.await.unwrap_or_else(|_| {
            Err(ApiError::unknown("pending operation dropped without resolution"))
        })
    }

    /// Finish the flow with the callback URI delivered by the platform.
    ///
    /// No-op when nothing is pending, so stray callbacks after cancellation
    /// cost no network traffic.
    pub async fn complete_redirect(&self, callback_uri: &str) {
        let in_flight = self.in_flight.lock().expect("lock poisoned").take();
        let Some(InFlight {
            correlation_id,
            sign_in_id,
        }) = in_flight
        else {
            debug!("redirect callback with no pending sign-in, ignoring");
            return;
        };

        let nonce = match Url::parse(callback_uri) {
            Ok(url) => url
                .query_pairs()
                .find(|(k, _)| k == NONCE_PARAM)
                .map(|(_, v)| v.into_owned()),
            Err(e) => {
                warn!(error = %e, "malformed redirect callback URI");
                self.pending.resolve_for(
                    &correlation_id,
                    Err(ApiError::unknown(format!(
                        "malformed redirect callback URI: {e}"
                    ))),
                );
                return;
            }
        };

        let result = match nonce {
            // The nonce means the attempt finished as a sign-in; refetch it
            // with the nonce so the rotated session token is honored.
            Some(nonce) => self
                .api
                .fetch_sign_in(&sign_in_id, Some(&nonce))
                .await
                .map(AuthOutcome::SignIn),
            // No nonce: the external account maps to no existing sign-in, so
            // transfer the attempt into a sign-up.
            None => self
                .api
                .create_sign_up_transfer()
                .await
                .map(AuthOutcome::SignUp),
        };

        if let Err(e) = &result {
            warn!(error = %e, sign_in_id = %sign_in_id, "redirect completion failed");
        }
        self.pending.resolve_for(&correlation_id, result);
    }

    /// Cancel the in-flight flow, resolving its awaiter with `Cancelled`.
    pub fn cancel(&self, reason: &str) {
        *self.in_flight.lock().expect("lock poisoned") = None;
        self.pending.cancel(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{complete_sign_in, redirect_sign_in, MockApi, RecordingLauncher};
    use std::sync::atomic::Ordering;

    fn bridge(api: Arc<MockApi>, launcher: Arc<RecordingLauncher>) -> Arc<RedirectBridge> {
        Arc::new(RedirectBridge::new(
            api,
            launcher,
            "idkit://oauth-callback",
        ))
    }

    // ====== happy paths ======

    #[tokio::test]
    async fn callback_with_nonce_completes_as_sign_in() {
        let api = Arc::new(MockApi::new());
        let launcher = Arc::new(RecordingLauncher::new());
        let bridge = bridge(api.clone(), launcher.clone());

        let flow = {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                bridge
                    .authenticate_with_redirect(OAuthProvider::Google)
                    .await
            })
        };

        let url = launcher.wait_for_launch().await;
        assert_eq!(url, "https://accounts.example.com/oauth/start");

        bridge
            .complete_redirect("idkit://oauth-callback?rotating_token_nonce=abc123")
            .await;

        let outcome = flow.await.unwrap().unwrap();
        assert!(matches!(outcome, AuthOutcome::SignIn(_)));
        assert_eq!(outcome.created_session_id(), Some("sess_new"));

        // The refetch must carry the original attempt id and the nonce.
        let (id, nonce) = api.last_sign_in_fetch.lock().unwrap().clone().unwrap();
        assert_eq!(id, "si_1");
        assert_eq!(nonce.as_deref(), Some("abc123"));
        assert_eq!(api.transfers.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn callback_without_nonce_transfers_to_sign_up() {
        let api = Arc::new(MockApi::new());
        let launcher = Arc::new(RecordingLauncher::new());
        let bridge = bridge(api.clone(), launcher.clone());

        let flow = {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                bridge
                    .authenticate_with_redirect(OAuthProvider::Github)
                    .await
            })
        };

        launcher.wait_for_launch().await;
        bridge.complete_redirect("idkit://oauth-callback?code=xyz").await;

        let outcome = flow.await.unwrap().unwrap();
        assert!(matches!(outcome, AuthOutcome::SignUp(_)));
        assert_eq!(api.transfers.load(Ordering::SeqCst), 1);
        assert_eq!(api.sign_in_fetches.load(Ordering::SeqCst), 0);
    }

    // ====== failure paths ======

    #[tokio::test]
    async fn create_failure_surfaces_to_caller() {
        let api = Arc::new(MockApi::new());
        *api.created_sign_in.lock().unwrap() =
            Err(ApiError::unknown("connection reset"));
        let launcher = Arc::new(RecordingLauncher::new());
        let bridge = bridge(api.clone(), launcher.clone());

        let result = bridge
            .authenticate_with_redirect(OAuthProvider::Google)
            .await;
        assert!(matches!(result, Err(ApiError::Unknown(_))));
        assert!(launcher.launched().is_empty());
    }

    #[tokio::test]
    async fn missing_redirect_url_fails_without_launch() {
        let api = Arc::new(MockApi::new());
        *api.created_sign_in.lock().unwrap() = Ok(redirect_sign_in("si_1", None));
        let launcher = Arc::new(RecordingLauncher::new());
        let bridge = bridge(api.clone(), launcher.clone());

        let result = bridge
            .authenticate_with_redirect(OAuthProvider::Google)
            .await;
        match result {
            Err(ApiError::Unknown(msg)) => {
                assert!(msg.contains("si_1"), "message should name the attempt: {msg}")
            }
            other => panic!("expected Unknown, got {other:?}"),
        }
        assert!(launcher.launched().is_empty());
    }

    #[tokio::test]
    async fn malformed_callback_uri_resolves_with_unknown() {
        let api = Arc::new(MockApi::new());
        let launcher = Arc::new(RecordingLauncher::new());
        let bridge = bridge(api.clone(), launcher.clone());

        let flow = {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                bridge
                    .authenticate_with_redirect(OAuthProvider::Google)
                    .await
            })
        };

        launcher.wait_for_launch().await;
        bridge.complete_redirect("::not a uri::").await;

        let result = flow.await.unwrap();
        assert!(matches!(result, Err(ApiError::Unknown(_))));
        // Neither completion endpoint may be hit for garbage input.
        assert_eq!(api.sign_in_fetches.load(Ordering::SeqCst), 0);
        assert_eq!(api.transfers.load(Ordering::SeqCst), 0);
    }

    // ====== supersede and cancellation ======

    #[tokio::test]
    async fn new_flow_supersedes_pending_one() {
        let api = Arc::new(MockApi::new());
        let launcher = Arc::new(RecordingLauncher::new());
        let bridge = bridge(api.clone(), launcher.clone());

        let first = {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                bridge
                    .authenticate_with_redirect(OAuthProvider::Google)
                    .await
            })
        };
        launcher.wait_for_launch().await;

        *api.created_sign_in.lock().unwrap() = Ok(redirect_sign_in(
            "si_2",
            Some("https://accounts.example.com/oauth/start2"),
        ));
        *api.fetched_sign_in.lock().unwrap() = Ok(complete_sign_in("si_2"));

        let second = {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                bridge
                    .authenticate_with_redirect(OAuthProvider::Apple)
                    .await
            })
        };

        // First flow is cancelled the moment the second begins.
        let first_result = first.await.unwrap();
        assert!(matches!(first_result, Err(ApiError::Cancelled(_))));

        for _ in 0..500 {
            if launcher.launched().len() == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        bridge
            .complete_redirect("idkit://oauth-callback?rotating_token_nonce=n2")
            .await;

        let outcome = second.await.unwrap().unwrap();
        assert!(matches!(outcome, AuthOutcome::SignIn(_)));
        let (id, _) = api.last_sign_in_fetch.lock().unwrap().clone().unwrap();
        assert_eq!(id, "si_2");
    }

    #[tokio::test]
    async fn callback_without_pending_flow_is_noop() {
        let api = Arc::new(MockApi::new());
        let launcher = Arc::new(RecordingLauncher::new());
        let bridge = bridge(api.clone(), launcher);

        bridge
            .complete_redirect("idkit://oauth-callback?rotating_token_nonce=abc")
            .await;

        assert_eq!(api.sign_in_fetches.load(Ordering::SeqCst), 0);
        assert_eq!(api.transfers.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancel_resolves_flow_with_reason() {
        let api = Arc::new(MockApi::new());
        let launcher = Arc::new(RecordingLauncher::new());
        let bridge = bridge(api, launcher.clone());

        let flow = {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                bridge
                    .authenticate_with_redirect(OAuthProvider::Google)
                    .await
            })
        };

        launcher.wait_for_launch().await;
        bridge.cancel("user dismissed the browser");

        match flow.await.unwrap() {
            Err(ApiError::Cancelled(reason)) => {
                assert_eq!(reason, "user dismissed the browser")
            }
            other => panic!("expected Cancelled, got {other:?}"),
        }
    }
}
