//! Roster server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus the
//! environment, opens the SQLite store (migrating it to the current schema),
//! and serves the HTTP API.
//!
//! ```text
//! roster                      # serve
//! roster migrate              # apply migrations and exit
//! roster purge user_2abc...   # hard-delete one user
//! ```

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use roster_api::{AppState, ServerConfig, rate_limit::RateLimiter};
use roster_core::store::UserStore as _;
use roster_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Bound on the start-up connectivity check.
const STARTUP_CHECK_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Parser)]
#[command(author, version, about = "Roster user directory service")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (default).
  Serve,
  /// Bring the database schema up to date and exit.
  Migrate,
  /// Permanently remove a user record.
  Purge {
    /// Clerk user id.
    subject_id: String,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg = ServerConfig::load(&cli.config).context("failed to load configuration")?;

  let db_path = cfg.database_path();
  let store = SqliteStore::open(&db_path)
    .await
    .with_context(|| format!("failed to open store at {db_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(cfg, store).await,
    Command::Migrate => {
      let version = store.schema_version().await?;
      println!("schema at version {version}");
      Ok(())
    }
    Command::Purge { subject_id } => {
      if store.purge(subject_id.clone()).await? {
        println!("purged {subject_id}");
      } else {
        println!("no user with id {subject_id}");
      }
      Ok(())
    }
  }
}

async fn serve(cfg: ServerConfig, store: SqliteStore) -> anyhow::Result<()> {
  tokio::time::timeout(STARTUP_CHECK_TIMEOUT, store.health_check())
    .await
    .context("database did not respond in time")?
    .context("database is unreachable")?;

  if cfg.clerk_webhook_secret.trim().is_empty() {
    tracing::warn!("CLERK_WEBHOOK_SECRET is not set; every webhook will be rejected");
  }

  let limiter = Arc::new(
    RateLimiter::new(cfg.quota()).context("invalid rate limit configuration")?,
  );
  limiter.spawn_sweeper();

  let schema_version = store.schema_version().await?;
  tracing::info!(
    schema_version,
    per_second = cfg.rate_limit_per_second,
    burst = cfg.rate_limit_burst,
    "store ready"
  );

  let address = format!("{}:{}", cfg.host, cfg.port);
  let state = AppState { store: Arc::new(store), config: Arc::new(cfg) };
  let app = roster_api::router(state, limiter);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
    .await
    .context("server error")?;

  Ok(())
}
