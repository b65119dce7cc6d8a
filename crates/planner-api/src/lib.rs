//! JSON REST API for the planner catalog.
//!
//! Exposes an axum [`Router`] backed by a [`Catalog`] over any
//! [`CatalogStore`]. Reads are public; visit writes sit behind
//! [`auth::RequireAdmin`] (HTTP Basic against the configured admin account).
//! TLS and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api/v1", planner_api::api_router(state))
//! ```

pub mod auth;
pub mod error;
pub mod souls;
pub mod visits;

use std::sync::Arc;

use axum::{
  Router,
  middleware::from_extractor_with_state,
  routing::{get, post, put},
};
use planner_core::{catalog::Catalog, store::CatalogStore};

pub use auth::AdminCredentials;
pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub catalog: Arc<Catalog<S>>,
  pub admin:   Arc<AdminCredentials>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      catalog: Arc::clone(&self.catalog),
      admin:   Arc::clone(&self.admin),
    }
  }
}

impl<S> ApiState<S> {
  pub fn new(catalog: Catalog<S>, admin: AdminCredentials) -> Self {
    Self { catalog: Arc::new(catalog), admin: Arc::new(admin) }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: CatalogStore + 'static,
{
  let admin = Router::new()
    .route("/visits", post(visits::create::<S>))
    .route(
      "/visits/{id}",
      put(visits::update::<S>).delete(visits::delete_one::<S>),
    )
    .route_layer(from_extractor_with_state::<auth::RequireAdmin, _>(state.clone()));

  Router::new()
    // Derived visit views
    .route("/visits/feed", get(visits::feed::<S>))
    .route("/visits/search", get(visits::search::<S>))
    .route("/visits/active", get(visits::active::<S>))
    .route("/visits/longest-absent", get(visits::longest_absent::<S>))
    .route("/visits/{id}", get(visits::get_one::<S>))
    // Souls
    .route("/souls/{id}", get(souls::get_one::<S>))
    .route("/souls/{id}/visits", get(souls::visits::<S>))
    // Visit writes
    .merge(admin)
    .with_state(state)
}
