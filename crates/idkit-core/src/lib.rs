//! # idkit-core: session/authentication orchestration
//!
//! The orchestration core of the idkit mobile SDK. It coordinates startup,
//! browser-based redirect authentication, background device attestation, and
//! periodic session-token refresh over the [`idkit_api::IdentityApi`] REST
//! surface.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐ configure ┌──────────────────┐  join!  ┌──────────────┐
//! │   Host    │──────────▶│       Sdk        │────────▶│ IdentityApi  │
//! │   app     │           │   (bootstrap)    │         │  (backend)   │
//! └─────┬─────┘           └───┬──────────┬───┘         └──────────────┘
//!       │                     │ on Ready │
//!       │              ┌──────▼───┐  ┌───▼──────────┐
//!       │              │  token   │  │ attestation  │
//!       │              │ refresh  │  │  supervisor  │
//!       │              └──────────┘  └──────────────┘
//!       │ authenticate_with_redirect
//!       ▼
//! ┌───────────────┐ begin/resolve ┌───────────────────┐
//! │ RedirectBridge│──────────────▶│ PendingOperations │
//! └───────────────┘               └───────────────────┘
//! ```
//!
//! ## Key pieces
//!
//! - **[`Sdk`]**: the long-lived handle constructed once at startup. Owns the
//!   readiness state, the resource snapshot, and the background task handles.
//! - **[`RedirectBridge`] / [`ConnectionBridge`]**: turn "launch a browser,
//!   wait for a callback" into one logical async call via a single-slot
//!   [`PendingOperations`] registry.
//! - **Token refresh loop / attestation supervisor**: detached background
//!   tasks fanned out after the SDK reaches `Ready`; neither can flip
//!   readiness back to `Failed`.

mod attestation;
mod attestor;
mod bootstrap;
mod browser;
mod config;
mod connect;
mod logging;
mod pending;
mod redirect;
mod refresh;
mod storage;
#[cfg(test)]
mod testutil;

pub use attestation::AttestationState;
pub use attestor::DeviceAttestor;
pub use bootstrap::{ReadinessState, Sdk};
pub use browser::BrowserLauncher;
pub use config::{derive_api_url, InstanceKind, KeyError, SdkConfig};
pub use connect::ConnectionBridge;
pub use logging::init_logging;
pub use pending::PendingOperations;
pub use redirect::RedirectBridge;
pub use storage::{MemoryStore, SessionStore, CLIENT_ID_KEY, SESSION_ID_KEY};
