//! The REST surface consumed by the orchestration layer.

use async_trait::async_trait;
use idkit_types::{
    ApiResult, Client, Environment, ExternalAccount, SessionToken, SignIn, SignUp,
};

/// Typed calls against the identity backend.
///
/// Implemented by [`crate::FrontendApi`] in production; tests substitute
/// their own implementations behind `Arc<dyn IdentityApi>`.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Fetch the current client/session bundle.
    async fn fetch_client(&self) -> ApiResult<Client>;

    /// Fetch the tenant environment configuration.
    async fn fetch_environment(&self) -> ApiResult<Environment>;

    /// Create a sign-in using an external redirect strategy.
    async fn create_sign_in_with_redirect(
        &self,
        strategy: &str,
        redirect_url: &str,
    ) -> ApiResult<SignIn>;

    /// Fetch an in-progress sign-in, optionally presenting a rotating-token
    /// nonce to resume it.
    async fn fetch_sign_in(
        &self,
        sign_in_id: &str,
        rotating_token_nonce: Option<&str>,
    ) -> ApiResult<SignIn>;

    /// Convert the in-progress identity flow into a sign-up.
    async fn create_sign_up_transfer(&self) -> ApiResult<SignUp>;

    /// Begin linking an OAuth provider to the authenticated user.
    async fn create_external_account(
        &self,
        strategy: &str,
        redirect_url: &str,
    ) -> ApiResult<ExternalAccount>;

    /// Fetch a session token, bypassing the backend token cache on demand.
    async fn fetch_token(&self, session_id: &str, skip_cache: bool) -> ApiResult<SessionToken>;

    /// Submit a device-integrity token for verification.
    async fn verify_attestation(&self, token: &str) -> ApiResult<()>;
}
