//! Server assembly for the mentoring API: configuration and the top-level
//! router.

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use chrono::Duration;
use config::{ConfigError, Environment, Source};
use mentor_api::{ApiState, DEFAULT_LINK_TTL_DAYS, api_router};
use mentor_core::{
  alerts::AlertPolicy, store::MentorStore, taxonomy::Taxonomy, templates::PlanTemplates,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// Prefix for environment overrides, e.g. `MENTOR_PORT=8080` or
/// `MENTOR_ALERTS__STALE_AFTER_MONTHS=3`.
pub const ENV_PREFIX: &str = "MENTOR";

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and the
/// environment.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:          String,
  #[serde(default = "default_port")]
  pub port:          u16,
  #[serde(default = "default_store_path")]
  pub store_path:    PathBuf,
  /// Lifetime of self-assessment links.
  #[serde(default = "default_link_ttl_days")]
  pub link_ttl_days: i64,
  /// JSON taxonomy to use instead of the built-in one.
  #[serde(default)]
  pub taxonomy_path: Option<PathBuf>,
  #[serde(default)]
  pub alerts:        AlertPolicy,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("mentor.db") }

fn default_link_ttl_days() -> i64 { DEFAULT_LINK_TTL_DAYS }

impl ServerConfig {
  /// Layer `file` under `MENTOR_`-prefixed environment variables.
  pub fn from_source<F>(file: F) -> Result<Self, ConfigError>
  where
    F: Source + Send + Sync + 'static,
  {
    config::Config::builder()
      .add_source(file)
      .add_source(
        Environment::with_prefix(ENV_PREFIX)
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Handler state for `store` under this configuration.
pub fn api_state<S>(store: Arc<S>, config: &ServerConfig, taxonomy: Taxonomy) -> ApiState<S> {
  ApiState {
    store,
    taxonomy: Arc::new(taxonomy),
    templates: Arc::new(PlanTemplates::builtin()),
    policy: Arc::new(config.alerts.clone()),
    link_ttl: Duration::days(config.link_ttl_days),
  }
}

/// The full application: the API under `/api`, with request tracing.
pub fn app<S>(state: ApiState<S>) -> Router
where
  S: MentorStore + 'static,
{
  Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{body::Body, http::Request};
  use config::{File, FileFormat};
  use mentor_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  fn parse(toml: &str) -> ServerConfig {
    ServerConfig::from_source(File::from_str(toml, FileFormat::Toml)).unwrap()
  }

  #[test]
  fn empty_file_uses_defaults() {
    let cfg = parse("");
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert_eq!(cfg.link_ttl_days, DEFAULT_LINK_TTL_DAYS);
    assert!(cfg.taxonomy_path.is_none());
    assert_eq!(cfg.alerts, AlertPolicy::default());
  }

  #[test]
  fn file_overrides_nested_alert_policy() {
    let cfg = parse(
      r#"
        port = 9000
        store_path = "/var/lib/mentor/mentor.db"

        [alerts]
        stale_after_months = 4
        decline_above = 0.25
      "#,
    );
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/mentor/mentor.db"));
    assert_eq!(cfg.alerts.stale_after_months, 4);
    assert_eq!(cfg.alerts.decline_above, 0.25);
    assert_eq!(cfg.alerts.overdue_after_months, 12);
  }

  #[tokio::test]
  async fn app_serves_api_under_prefix() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let cfg = parse("link_ttl_days = 3");
    let state = api_state(Arc::new(store), &cfg, Taxonomy::legacy());
    assert_eq!(state.link_ttl, Duration::days(3));

    let resp = app(state)
      .oneshot(Request::get("/api/taxonomy").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let taxonomy: Taxonomy = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(taxonomy.version, "legacy-1");

    let missing = app(api_state(
      Arc::new(SqliteStore::open_in_memory().await.unwrap()),
      &cfg,
      Taxonomy::psi(),
    ))
    .oneshot(Request::get("/taxonomy").body(Body::empty()).unwrap())
    .await
    .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
  }
}
