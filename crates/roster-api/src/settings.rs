//! Runtime configuration.
//!
//! Sources, lowest precedence first: an optional TOML file, `ROSTER_*`
//! environment variables, then the unprefixed `DATABASE_URL` and
//! `CLERK_WEBHOOK_SECRET` variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use config::{Config, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;

use crate::rate_limit::{DEFAULT_BURST, DEFAULT_RATE_PER_SECOND, Quota};

/// Runtime server configuration.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                  String,
  #[serde(default = "default_port")]
  pub port:                  u16,
  /// SQLite path, optionally prefixed `sqlite://`. Required.
  pub database_url:          String,
  /// `whsec_…` secret from the provider dashboard. Without it every webhook
  /// is rejected.
  #[serde(default)]
  pub clerk_webhook_secret:  String,
  #[serde(default = "default_rate")]
  pub rate_limit_per_second: f64,
  #[serde(default = "default_burst")]
  pub rate_limit_burst:      u32,
  /// Upper bound on any store call made while serving a request.
  #[serde(default = "default_timeout")]
  pub request_timeout_secs:  u64,
  /// Use the first `X-Forwarded-For` entry as the client identity. Only
  /// enable behind a proxy that sets it.
  #[serde(default)]
  pub trust_forwarded_for:   bool,
}

fn default_host() -> String { "0.0.0.0".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_rate() -> f64 { DEFAULT_RATE_PER_SECOND }
fn default_burst() -> u32 { DEFAULT_BURST }
fn default_timeout() -> u64 { 8 }

impl ServerConfig {
  /// Load from `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let builder = Config::builder()
      .add_source(File::from(path).required(false))
      .add_source(Environment::with_prefix("ROSTER").try_parsing(true))
      .set_override_option("database_url", std::env::var("DATABASE_URL").ok())?
      .set_override_option(
        "clerk_webhook_secret",
        std::env::var("CLERK_WEBHOOK_SECRET").ok(),
      )?;
    Self::from_builder(builder)
  }

  fn from_builder(builder: config::ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
    let cfg: Self = builder.build()?.try_deserialize()?;
    if cfg.database_url.trim().is_empty() {
      return Err(ConfigError::Message("database_url must not be empty".to_owned()));
    }
    Ok(cfg)
  }

  pub fn quota(&self) -> Quota {
    Quota { per_second: self.rate_limit_per_second, burst: self.rate_limit_burst }
  }

  pub fn request_timeout(&self) -> Duration { Duration::from_secs(self.request_timeout_secs) }

  /// Filesystem path for the store, with any `sqlite:` scheme stripped and a
  /// leading `~/` expanded.
  pub fn database_path(&self) -> PathBuf {
    let raw = self.database_url.trim();
    let raw = raw
      .strip_prefix("sqlite://")
      .or_else(|| raw.strip_prefix("sqlite:"))
      .unwrap_or(raw);
    expand_tilde(Path::new(raw))
  }
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

#[cfg(test)]
mod tests {
  use config::FileFormat;

  use super::*;

  fn from_toml(toml: &str) -> Result<ServerConfig, ConfigError> {
    ServerConfig::from_builder(
      Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
    )
  }

  #[test]
  fn defaults_apply() {
    let cfg = from_toml(r#"database_url = "roster.db""#).unwrap();
    assert_eq!(cfg.host, "0.0.0.0");
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.clerk_webhook_secret, "");
    assert_eq!(cfg.quota(), Quota::default());
    assert_eq!(cfg.request_timeout(), Duration::from_secs(8));
    assert!(!cfg.trust_forwarded_for);
  }

  #[test]
  fn database_url_is_required() {
    assert!(from_toml(r#"port = 9000"#).is_err());
    assert!(from_toml(r#"database_url = "  ""#).is_err());
  }

  #[test]
  fn overrides_are_read() {
    let cfg = from_toml(
      r#"
      database_url = "sqlite://data/roster.db"
      rate_limit_per_second = 2.5
      rate_limit_burst = 4
      trust_forwarded_for = true
      "#,
    )
    .unwrap();
    assert_eq!(cfg.quota(), Quota { per_second: 2.5, burst: 4 });
    assert!(cfg.trust_forwarded_for);
    assert_eq!(cfg.database_path(), PathBuf::from("data/roster.db"));
  }

  #[test]
  fn database_path_accepts_plain_paths() {
    let cfg = from_toml(r#"database_url = "sqlite::memory:""#).unwrap();
    assert_eq!(cfg.database_path(), PathBuf::from(":memory:"));
    let cfg = from_toml(r#"database_url = "/var/lib/roster.db""#).unwrap();
    assert_eq!(cfg.database_path(), PathBuf::from("/var/lib/roster.db"));
  }
}
