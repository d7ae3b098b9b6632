//! Client/session bundle resources.
//!
//! The client resource describes the current device's authenticated sessions
//! as seen by the backend.

use crate::error::ApiErrorDetail;
use serde::{Deserialize, Serialize};

/// The backend resource describing this device's sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active_session_id: Option<String>,
}

impl Client {
    /// The session the backend considers active, if any.
    ///
    /// Prefers the backend's `last_active_session_id` pointer and falls back
    /// to the first session with `Active` status.
    pub fn active_session(&self) -> Option<&Session> {
        match &self.last_active_session_id {
            Some(id) => self.sessions.iter().find(|s| s.id == *id),
            None => self
                .sessions
                .iter()
                .find(|s| s.status == SessionStatus::Active),
        }
    }

    pub fn active_session_id(&self) -> Option<&str> {
        self.active_session().map(|s| s.id.as_str())
    }
}

/// An authenticated session on this device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Expired,
    Removed,
    Revoked,
    Ended,
}

/// The user a session belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub external_accounts: Vec<ExternalAccount>,
}

/// An OAuth provider account linked to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalAccount {
    pub id: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,
}

/// Verification status of a factor or linked account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub status: VerificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_verification_redirect_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorDetail>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Unverified,
    Verified,
    Transferable,
    Failed,
    Expired,
}
