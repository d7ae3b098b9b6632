//! Browser bridge for connecting external accounts to the signed-in user.
//!
//! Same shape as the sign-in redirect bridge, but the flow starts from an
//! authenticated user and ends by verifying the new account on the refetched
//! client instead of inspecting the callback URI.

use crate::browser::BrowserLauncher;
use crate::pending::PendingOperations;
use idkit_api::IdentityApi;
use idkit_types::{ApiError, ApiResult, ExternalAccount, OAuthProvider, VerificationStatus};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

struct InFlight {
    correlation_id: String,
    account_id: String,
}

/// Orchestrates the browser round-trip for external-account connection.
pub struct ConnectionBridge {
    api: Arc<dyn IdentityApi>,
    launcher: Arc<dyn BrowserLauncher>,
    redirect_url: String,
    pending: PendingOperations<ExternalAccount>,
    in_flight: Mutex<Option<InFlight>>,
}

impl ConnectionBridge {
    pub fn new(
        api: Arc<dyn IdentityApi>,
        launcher: Arc<dyn BrowserLauncher>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            api,
            launcher,
            redirect_url: redirect_url.into(),
            pending: PendingOperations::new("connect"),
            in_flight: Mutex::new(None),
        }
    }

    /// Start connecting an external account and wait for verification.
    ///
    /// Supersedes any connection already in flight; concurrent connects
    /// resolve most-recent-wins.
    pub async fn connect(&self, provider: OAuthProvider) -> ApiResult<ExternalAccount> {
        let correlation_id = uuid::Uuid::new_v4().to_string();
        let rx = self.pending.begin(correlation_id.clone());
        *self.in_flight.lock().expect("lock poisoned") = None;

        let account = match self
            .api
            .create_external_account(&provider.strategy(), &self.redirect_url)
            .await
        {
            Ok(account) => account,
            Err(e) => {
                self.pending.resolve_for(&correlation_id, Err(e.clone()));
                return Err(e);
            }
        };

        let url = account
            .verification
            .as_ref()
            .and_then(|v| v.external_verification_redirect_url.clone());
        let url = match url {
            Some(url) => url,
            None => {
                let e = ApiError::unknown(format!(
                    "external account {} has no verification redirect URL",
                    account.id
                ));
                self.pending.resolve_for(&correlation_id, Err(e.clone()));
                return Err(e);
            }
        };

        if self.pending.current_id().as_deref() == Some(correlation_id.as_str()) {
            *self.in_flight.lock().expect("lock poisoned") = Some(InFlight {
                correlation_id: correlation_id.clone(),
                account_id: account.id.clone(),
            });
            debug!(account_id = %account.id, "launching external account verification");
            self.launcher.launch(&url);
        }

        rx.await.unwrap_or_else(|_| {
            Err(ApiError::unknown("pending operation dropped without resolution"))
        })
    }

    /// Finish the flow after the browser returns: refetch the client and
    /// check whether the pending account verified.
    pub async fn complete_connection(&self) {
        let in_flight = self.in_flight.lock().expect("lock poisoned").take();
        let Some(InFlight {
            correlation_id,
            account_id,
        }) = in_flight
        else {
            debug!("connection callback with no pending account, ignoring");
            return;
        };

        let client = match self.api.fetch_client().await {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, account_id = %account_id, "client refetch after connection failed");
                self.pending.resolve_for(&correlation_id, Err(e));
                return;
            }
        };

        let account = client
            .sessions
            .iter()
            .filter_map(|s| s.user.as_ref())
            .flat_map(|u| u.external_accounts.iter())
            .find(|a| a.id == account_id)
            .cloned();

        let result = match account {
            Some(account) => {
                let status = account
                    .verification
                    .as_ref()
                    .map(|v| v.status)
                    .unwrap_or(VerificationStatus::Unverified);
                if status == VerificationStatus::Verified {
                    Ok(account)
                } else {
                    Err(ApiError::unknown(format!(
                        "external account {account_id} did not verify (status {status:?})"
                    )))
                }
            }
            None => Err(ApiError::unknown(format!(
                "external account {account_id} missing from refreshed client"
            ))),
        };

        self.pending.resolve_for(&correlation_id, result);
    }

    /// Cancel the in-flight connection.
    pub fn cancel(&self, reason: &str) {
        *self.in_flight.lock().expect("lock poisoned") = None;
        self.pending.cancel(reason);
    }
}
