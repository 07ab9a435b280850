//! Lumen server wiring: configuration loading and router assembly.
//!
//! The binary in `main.rs` is a thin shell over these functions.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use axum::Router;
use lumen_api::{AppState, WebhookClient};
use lumen_core::{cache::DEFAULT_EXPIRY_HOURS, category::ResultCategory};
use lumen_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `LUMEN_`-prefixed environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                 String,
  #[serde(default = "default_port")]
  pub port:                 u16,
  #[serde(default = "default_store_path")]
  pub store_path:           PathBuf,
  #[serde(default = "default_expiry_hours")]
  pub default_expiry_hours: u32,
  #[serde(default = "default_webhook_timeout_secs")]
  pub webhook_timeout_secs: u64,
  /// Webhook URL per result category, e.g. `module_content = "https://..."`.
  #[serde(default)]
  pub webhooks:             HashMap<String, String>,
}

impl ServerConfig {
  /// `webhooks` keyed by category. Unknown category names are an error.
  pub fn webhook_endpoints(&self) -> anyhow::Result<HashMap<ResultCategory, String>> {
    self
      .webhooks
      .iter()
      .map(|(name, url)| {
        let category = name
          .parse::<ResultCategory>()
          .with_context(|| format!("invalid key in [webhooks]: {name:?}"))?;
        Ok::<_, anyhow::Error>((category, url.clone()))
      })
      .collect()
  }
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("lumen.db") }

fn default_expiry_hours() -> u32 { DEFAULT_EXPIRY_HOURS }

fn default_webhook_timeout_secs() -> u64 {
  lumen_api::webhook::DEFAULT_TIMEOUT.as_secs()
}

/// Read `path` (if it exists) layered under the environment.
///
/// Nested keys use `__` in environment variables, e.g.
/// `LUMEN_WEBHOOKS__MODULE_CONTENT=https://...`.
pub fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("LUMEN")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read config file")?;

  settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router over an opened store.
pub fn app(store: SqliteStore, cfg: &ServerConfig) -> anyhow::Result<Router> {
  let webhook = WebhookClient::new(
    cfg.webhook_endpoints()?,
    Duration::from_secs(cfg.webhook_timeout_secs),
  )
  .context("failed to build webhook client")?;

  for category in ResultCategory::ALL {
    if webhook.endpoint(category).is_none() {
      tracing::warn!(%category, "no webhook configured; generation will be rejected");
    }
  }

  let state = AppState::new(store, webhook, cfg.default_expiry_hours);
  Ok(
    Router::new()
      .nest("/api", lumen_api::api_router(state))
      .layer(TraceLayer::new_for_http()),
  )
}

#[cfg(test)]
mod tests {
  use std::fs;

  use uuid::Uuid;

  use super::*;

  #[test]
  fn config_file_values_and_defaults() {
    let path = std::env::temp_dir()
      .join(format!("lumen-config-{}.toml", Uuid::new_v4()));
    fs::write(
      &path,
      r#"
        port = 9090
        default_expiry_hours = 12

        [webhooks]
        module_content = "https://hooks.example.com/webhook/module-content"
      "#,
    )
    .unwrap();

    let cfg = load_config(&path).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(cfg.port, 9090);
    assert_eq!(cfg.default_expiry_hours, 12);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.webhook_timeout_secs, 30);
    let endpoints = cfg.webhook_endpoints().unwrap();
    assert_eq!(
      endpoints.get(&ResultCategory::ModuleContent).map(String::as_str),
      Some("https://hooks.example.com/webhook/module-content")
    );
    assert!(!endpoints.contains_key(&ResultCategory::Transcript));
  }

  #[tokio::test]
  async fn unknown_webhook_category_is_rejected() {
    let mut cfg = test_config();
    cfg.webhooks.insert("quizzes".into(), "https://hooks.example.com/q".into());
    assert!(cfg.webhook_endpoints().is_err());

    let store = SqliteStore::open_in_memory().await.unwrap();
    assert!(app(store, &cfg).is_err());
  }

  fn test_config() -> ServerConfig {
    ServerConfig {
      host:                 default_host(),
      port:                 default_port(),
      store_path:           default_store_path(),
      default_expiry_hours: default_expiry_hours(),
      webhook_timeout_secs: default_webhook_timeout_secs(),
      webhooks:             HashMap::new(),
    }
  }

  #[test]
  fn expand_tilde_leaves_plain_paths_alone() {
    assert_eq!(expand_tilde(Path::new("data/lumen.db")), PathBuf::from("data/lumen.db"));
  }

  #[tokio::test]
  async fn app_serves_stats_over_fresh_store() {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt as _;

    let store = SqliteStore::open_in_memory().await.unwrap();
    let cfg = test_config();

    let resp = app(store, &cfg)
      .unwrap()
      .oneshot(Request::builder().uri("/api/stats").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert!(resp.status().is_success());

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let stats: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(stats["total"], serde_json::json!(0));
  }
}
