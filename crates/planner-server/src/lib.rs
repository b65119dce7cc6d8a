//! HTTP server assembly for the planner catalog.
//!
//! Mounts the JSON API under `/api/v1`, adds a liveness check, and wraps
//! everything in a request-tracing layer.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context as _, ensure};
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::{Router, routing::get};
use planner_api::{AdminCredentials, ApiState};
use planner_core::{catalog::Catalog, project::Projector, store::CatalogStore};
use planner_store_sqlite::SqliteStore;
use rand_core::OsRng;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `PLANNER_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  /// Absolute `http(s)://` base that relative image paths are resolved
  /// against.
  pub public_base_url:     String,
  /// SQLite file; a leading `~/` is expanded against `$HOME`.
  pub store_path:          PathBuf,
  pub admin_username:      String,
  pub admin_password_hash: String,
}

impl ServerConfig {
  /// Layer `path` (optional) under `PLANNER_*` variables, then validate.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let cfg: Self = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("PLANNER"))
      .build()
      .with_context(|| format!("failed to read configuration from {}", path.display()))?
      .try_deserialize()
      .context("configuration is incomplete")?;
    cfg.validate()?;
    Ok(cfg)
  }

  pub fn validate(&self) -> anyhow::Result<()> {
    let host = self
      .public_base_url
      .strip_prefix("https://")
      .or_else(|| self.public_base_url.strip_prefix("http://"));
    ensure!(
      host.is_some_and(|h| !h.is_empty() && !h.starts_with('/')),
      "public_base_url must be an absolute http(s) URL, got {:?}",
      self.public_base_url
    );
    Ok(())
  }

  pub fn admin(&self) -> anyhow::Result<AdminCredentials> {
    AdminCredentials::new(&self.admin_username, &self.admin_password_hash)
      .context("admin_password_hash is unusable; regenerate it with --hash-password")
  }

  pub fn projector(&self) -> Projector { Projector::new(self.public_base_url.clone()) }

  pub fn bind_address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn resolved_store_path(&self) -> PathBuf {
    if let Ok(rest) = self.store_path.strip_prefix("~")
      && let Some(home) = std::env::var_os("HOME")
    {
      return PathBuf::from(home).join(rest);
    }
    self.store_path.clone()
  }

  /// Open the store and assemble handler state.
  pub async fn open_state(&self) -> anyhow::Result<ApiState<SqliteStore>> {
    let admin = self.admin()?;
    let path = self.resolved_store_path();
    let store = SqliteStore::open(&path)
      .await
      .with_context(|| format!("failed to open store at {}", path.display()))?;
    let catalog = Catalog::new(Arc::new(store), self.projector());
    Ok(ApiState::new(catalog, admin))
  }
}

/// Argon2id PHC string for `password`, as expected in `admin_password_hash`.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map_err(|e| anyhow::anyhow!("argon2 hashing failed: {e}"))?;
  Ok(hash.to_string())
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the top-level axum [`Router`].
pub fn router<S>(state: ApiState<S>) -> Router
where
  S: CatalogStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    .nest("/api/v1", planner_api::api_router(state))
    .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str { "ok" }

// ─── Integration tests ────────────────────────────────────────────────────────
