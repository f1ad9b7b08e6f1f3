//! mentor-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, and either serves the REST API or runs a single risk-alert scan.
//!
//! ```text
//! mentor-server --config /etc/mentor.toml serve
//! mentor-server alerts --json
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use mentor_api::analytics::AlertsView;
use mentor_core::{
  alerts::{AlertSummary, detect_risk_alerts},
  taxonomy::Taxonomy,
};
use mentor_server::{ServerConfig, api_state, app};
use mentor_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "School mentoring assessment server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the REST API (the default).
  Serve,
  /// Scan every school once and print its risk alerts.
  Alerts {
    /// Print `{summary, alerts}` as JSON instead of one line per alert.
    #[arg(long)]
    json:  bool,
    /// Evaluate as of this date instead of today (YYYY-MM-DD).
    #[arg(long)]
    today: Option<NaiveDate>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let cfg = ServerConfig::from_source(config::File::from(cli.config.as_path()).required(false))
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let taxonomy = load_taxonomy(cfg.taxonomy_path.as_deref())?;
  tracing::info!(
    version = %taxonomy.version,
    domains = taxonomy.domains.len(),
    questions = taxonomy.question_count(),
    "taxonomy loaded"
  );

  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(store, cfg, taxonomy).await,
    Command::Alerts { json, today } => {
      let today = today.unwrap_or_else(|| Utc::now().date_naive());
      print_alerts(&store, &cfg, &taxonomy, today, json).await
    }
  }
}

async fn serve(store: SqliteStore, cfg: ServerConfig, taxonomy: Taxonomy) -> anyhow::Result<()> {
  let address = cfg.address();
  let router = app(api_state(Arc::new(store), &cfg, taxonomy));

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, router).await.context("server error")?;
  Ok(())
}

async fn print_alerts(
  store: &SqliteStore,
  cfg: &ServerConfig,
  taxonomy: &Taxonomy,
  today: NaiveDate,
  json: bool,
) -> anyhow::Result<()> {
  let alerts = detect_risk_alerts(store, taxonomy, &cfg.alerts, today)
    .await
    .context("risk-alert scan failed")?;
  let summary = AlertSummary::of(&alerts);

  if json {
    let view = AlertsView { summary, alerts };
    println!("{}", serde_json::to_string_pretty(&view)?);
    return Ok(());
  }

  for alert in &alerts {
    let severity: &str = alert.severity.as_ref();
    println!("{severity:<6}  {:<30}  {}", alert.school_name, alert.message);
  }
  println!(
    "{} alerts: {} high, {} medium, {} low",
    alerts.len(),
    summary.high,
    summary.medium,
    summary.low
  );
  Ok(())
}

/// The taxonomy at `path`, or the built-in one.
fn load_taxonomy(path: Option<&Path>) -> anyhow::Result<Taxonomy> {
  let Some(path) = path else {
    return Ok(Taxonomy::psi());
  };
  let path = expand_tilde(path);
  let json = std::fs::read_to_string(&path)
    .with_context(|| format!("failed to read taxonomy {path:?}"))?;
  Taxonomy::from_json(&json).with_context(|| format!("invalid taxonomy {path:?}"))
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
