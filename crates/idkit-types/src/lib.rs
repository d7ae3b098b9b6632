//! Shared resource types for the idkit SDK.
//!
//! This crate defines:
//! - The failure taxonomy ([`ApiError`]) and [`ApiResult`] envelope used by
//!   every async operation in the SDK
//! - The backend resources the orchestration layer consumes (client/session
//!   bundle, environment, sign-in, sign-up, external accounts, tokens)

mod auth;
mod client;
mod environment;
mod error;

pub use auth::{
    AuthOutcome, OAuthProvider, SessionToken, SignIn, SignInStatus, SignUp, SignUpStatus,
};
pub use client::{
    Client, ExternalAccount, Session, SessionStatus, User, Verification, VerificationStatus,
};
pub use environment::{AttestationMode, Environment, FraudSettings};
pub use error::{ApiError, ApiErrorDetail, ApiErrorResponse, ApiResult};
