//! Production REST client over reqwest.

use crate::api::IdentityApi;
use async_trait::async_trait;
use idkit_types::{
    ApiError, ApiErrorResponse, ApiResult, Client, Environment, ExternalAccount, SessionToken,
    SignIn, SignUp,
};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Query marker identifying requests from a native client.
const NATIVE_FLAG: &str = "_is_native";

/// REST client for the identity backend's frontend API.
#[derive(Clone)]
pub struct FrontendApi {
    http_client: reqwest::Client,
    base_url: String,
    publishable_key: String,
}

impl FrontendApi {
    /// Create a new frontend API client.
    ///
    /// # Arguments
    /// * `base_url` - Backend instance address (e.g. `https://api.example-app.dev`)
    /// * `publishable_key` - The key identifying this application
    pub fn new(base_url: impl Into<String>, publishable_key: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into(),
            publishable_key: publishable_key.into(),
        }
    }

    /// Build the versioned URL for an API path.
    fn v1_url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    fn base_query(&self) -> [(&'static str, &str); 2] {
        [
            (NATIVE_FLAG, "1"),
            ("publishable_key", self.publishable_key.as_str()),
        ]
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<T> {
        debug!(path = path, "GET {}", path);
        let response = self
            .http_client
            .get(self.v1_url(path))
            .query(&self.base_query())
            .query(query)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|err| ApiError::Unknown(format!("request failed: {}", err)))?;
        map_response(response).await
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> ApiResult<T> {
        debug!(path = path, "POST {}", path);
        let response = self
            .http_client
            .post(self.v1_url(path))
            .query(&self.base_query())
            .query(query)
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await
            .map_err(|err| ApiError::Unknown(format!("request failed: {}", err)))?;
        map_response(response).await
    }

    async fn post_form_unit(&self, path: &str, form: &[(&str, &str)]) -> ApiResult<()> {
        debug!(path = path, "POST {}", path);
        let response = self
            .http_client
            .post(self.v1_url(path))
            .query(&self.base_query())
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await
            .map_err(|err| ApiError::Unknown(format!("request failed: {}", err)))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| ApiError::Unknown(format!("failed reading response body: {}", err)))?;
        if (200..300).contains(&status) {
            Ok(())
        } else {
            Err(parse_failure(status, body))
        }
    }
}

#[async_trait]
impl IdentityApi for FrontendApi {
    async fn fetch_client(&self) -> ApiResult<Client> {
        self.get_json("client", &[]).await
    }

    async fn fetch_environment(&self) -> ApiResult<Environment> {
        self.get_json("environment", &[]).await
    }

    async fn create_sign_in_with_redirect(
        &self,
        strategy: &str,
        redirect_url: &str,
    ) -> ApiResult<SignIn> {
        self.post_form(
            "client/sign_ins",
            &[],
            &[("strategy", strategy), ("redirect_url", redirect_url)],
        )
        .await
    }

    async fn fetch_sign_in(
        &self,
        sign_in_id: &str,
        rotating_token_nonce: Option<&str>,
    ) -> ApiResult<SignIn> {
        let path = format!("client/sign_ins/{}", sign_in_id);
        match rotating_token_nonce {
            Some(nonce) => {
                self.get_json(&path, &[("rotating_token_nonce", nonce)])
                    .await
            }
            None => self.get_json(&path, &[]).await,
        }
    }

    async fn create_sign_up_transfer(&self) -> ApiResult<SignUp> {
        self.post_form("client/sign_ups", &[], &[("transfer", "true")])
            .await
    }

    async fn create_external_account(
        &self,
        strategy: &str,
        redirect_url: &str,
    ) -> ApiResult<ExternalAccount> {
        self.post_form(
            "me/external_accounts",
            &[],
            &[("strategy", strategy), ("redirect_url", redirect_url)],
        )
        .await
    }

    async fn fetch_token(&self, session_id: &str, skip_cache: bool) -> ApiResult<SessionToken> {
        let path = format!("client/sessions/{}/tokens", session_id);
        let query: &[(&str, &str)] = if skip_cache {
            &[("skip_cache", "true")]
        } else {
            &[]
        };
        self.post_form(&path, query, &[]).await
    }

    async fn verify_attestation(&self, token: &str) -> ApiResult<()> {
        self.post_form_unit("client/verify", &[("token", token)])
            .await
    }
}

async fn map_response<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|err| ApiError::Unknown(format!("failed reading response body: {}", err)))?;
    if (200..300).contains(&status) {
        parse_success(&body)
    } else {
        Err(parse_failure(status, body))
    }
}

fn parse_success<T: DeserializeOwned>(body: &str) -> ApiResult<T> {
    serde_json::from_str(body)
        .map_err(|err| ApiError::Unknown(format!("malformed response body: {}", err)))
}

fn parse_failure(status: u16, body: String) -> ApiError {
    match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(parsed) if !parsed.errors.is_empty() => ApiError::Api(parsed),
        _ => ApiError::Http { status, body },
    }
}
