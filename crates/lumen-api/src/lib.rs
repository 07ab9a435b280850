//! JSON REST API for Lumen.
//!
//! Exposes an axum [`Router`] backed by a [`ResultCache`] over any
//! [`lumen_core::store::ResultStore`]. Auth, TLS, and transport concerns are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", lumen_api::api_router(state))
//! ```

pub mod error;
pub mod extract;
pub mod generate;
pub mod results;
pub mod subjects;
pub mod webhook;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use lumen_core::{ResultCache, store::ResultStore};

pub use error::ApiError;
pub use webhook::{WebhookClient, WebhookError};

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
#[derive(Clone)]
pub struct AppState<S: ResultStore> {
  pub cache:                Arc<ResultCache<S>>,
  pub webhook:              WebhookClient,
  /// Freshness window used when a request does not name one.
  pub default_expiry_hours: u32,
}

impl<S: ResultStore> AppState<S> {
  pub fn new(store: S, webhook: WebhookClient, default_expiry_hours: u32) -> Self {
    Self {
      cache: Arc::new(ResultCache::new(store)),
      webhook,
      default_expiry_hours,
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: ResultStore + Clone + 'static,
{
  Router::new()
    // Generation
    .route("/generate/{category}", post(generate::handler::<S>))
    // Results
    .route(
      "/results/{subject_key}",
      get(results::history::<S>).delete(results::clear::<S>),
    )
    .route("/results/{subject_key}/{category}", get(results::get_cached::<S>))
    .route("/records/{id}", get(results::get_record::<S>))
    .route("/stats", get(results::stats::<S>))
    // Subject patches
    .route("/subjects/{kind}/{key}/{category}", get(subjects::get_patch::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
