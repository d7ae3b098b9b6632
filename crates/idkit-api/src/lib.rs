//! Typed REST client for the hosted identity backend.
//!
//! This crate provides:
//! - [`IdentityApi`], the trait seam the orchestration layer consumes
//! - [`FrontendApi`], the production implementation over reqwest
//!
//! Transport reliability (TLS, connection pooling) is reqwest's concern;
//! this layer only maps responses into the [`idkit_types::ApiResult`]
//! envelope.

mod api;
mod client;

pub use api::IdentityApi;
pub use client::FrontendApi;
