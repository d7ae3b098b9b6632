//! Sign-in, sign-up, and token resources.

use crate::client::Verification;
use serde::{Deserialize, Serialize};

/// An in-progress sign-in attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignIn {
    pub id: String,
    pub status: SignInStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_factor_verification: Option<Verification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignInStatus {
    NeedsIdentifier,
    NeedsFirstFactor,
    NeedsSecondFactor,
    Complete,
    Abandoned,
}

/// An in-progress sign-up attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignUp {
    pub id: String,
    pub status: SignUpStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignUpStatus {
    MissingRequirements,
    Complete,
    Abandoned,
}

/// A short-lived session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionToken {
    pub jwt: String,
}

/// Result of a completed redirect authentication flow.
///
/// The identity flow can finish as either a resumed sign-in (the callback
/// carried a rotating-token nonce) or a sign-up created via transfer (it did
/// not).
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    SignIn(SignIn),
    SignUp(SignUp),
}

impl AuthOutcome {
    /// Session created by the completed flow, if the backend issued one.
    pub fn created_session_id(&self) -> Option<&str> {
        match self {
            Self::SignIn(sign_in) => sign_in.created_session_id.as_deref(),
            Self::SignUp(sign_up) => sign_up.created_session_id.as_deref(),
        }
    }
}

/// OAuth provider selector for redirect flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Apple,
    Github,
    Custom(String),
}

impl OAuthProvider {
    /// The strategy string the backend expects for this provider.
    pub fn strategy(&self) -> String {
        match self {
            Self::Google => "oauth_google".to_string(),
            Self::Apple => "oauth_apple".to_string(),
            Self::Github => "oauth_github".to_string(),
            Self::Custom(provider) => format!("oauth_{}", provider),
        }
    }
}
