//! Server configuration.
//!
//! Values come from an optional TOML file layered under environment
//! variables prefixed with `COUNTRYDLE_`; nested keys are separated by `__`
//! (for example `COUNTRYDLE_LLM__API_KEY`).

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::NaiveTime;
use countrydle_core::schedule::DEFAULT_HORIZON_DAYS;
use countrydle_oracle::LlmConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  pub round_horizon_days: u32,
  /// Wall-clock time (UTC, `HH:MM`) at which the daily jobs run.
  pub daily_job_at:       String,
  pub startup_retry:      RetryConfig,
  pub llm:                LlmConfig,
  pub index:              IndexConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:               "127.0.0.1".into(),
      port:               8080,
      store_path:         PathBuf::from("countrydle.db"),
      round_horizon_days: DEFAULT_HORIZON_DAYS,
      daily_job_at:       "00:01".into(),
      startup_retry:      RetryConfig::default(),
      llm:                LlmConfig::default(),
      index:              IndexConfig::default(),
    }
  }
}

impl ServerConfig {
  pub fn job_time(&self) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(&self.daily_job_at, "%H:%M")
      .with_context(|| format!("daily_job_at {:?} is not HH:MM", self.daily_job_at))
  }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
  pub attempts:   u32,
  pub delay_secs: u64,
}

impl Default for RetryConfig {
  fn default() -> Self { Self { attempts: 5, delay_secs: 5 } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
  Qdrant,
  Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
  pub kind:           IndexKind,
  pub url:            String,
  pub collection:     String,
  pub embedding_size: usize,
  /// Snapshot to restore when the collection is missing.
  pub snapshot_path:  Option<PathBuf>,
  pub timeout_secs:   u64,
}

impl Default for IndexConfig {
  fn default() -> Self {
    Self {
      kind:           IndexKind::Qdrant,
      url:            "http://localhost:6333".into(),
      collection:     "countries".into(),
      embedding_size: 1536,
      snapshot_path:  None,
      timeout_secs:   30,
    }
  }
}

/// Read the layered configuration, starting from `path` if it exists.
pub fn load(path: &Path) -> anyhow::Result<ServerConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("COUNTRYDLE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
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

#[cfg(test)]
mod tests {
  use config::{File, FileFormat};

  use super::*;

  fn from_toml(text: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(File::from_str(text, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_file_gives_defaults() {
    let config = from_toml("");
    assert_eq!(config.port, 8080);
    assert_eq!(config.round_horizon_days, 5);
    assert_eq!(config.startup_retry.attempts, 5);
    assert_eq!(config.index.kind, IndexKind::Qdrant);
    assert_eq!(config.llm.quiz_model, "gpt-4o-mini");
    assert_eq!(config.job_time().unwrap(), NaiveTime::from_hms_opt(0, 1, 0).unwrap());
  }

  #[test]
  fn nested_sections_override_defaults() {
    let config = from_toml(
      r#"
        port = 9000
        daily_job_at = "03:30"

        [index]
        kind = "memory"
        snapshot_path = "/snapshots/countries.snapshot"

        [llm]
        base_url = "http://localhost:11434/v1"
      "#,
    );
    assert_eq!(config.port, 9000);
    assert_eq!(config.index.kind, IndexKind::Memory);
    assert_eq!(config.index.collection, "countries");
    assert!(config.index.snapshot_path.is_some());
    assert_eq!(config.llm.base_url, "http://localhost:11434/v1");
    assert_eq!(config.llm.embedding_model, "text-embedding-3-small");
    assert_eq!(config.job_time().unwrap(), NaiveTime::from_hms_opt(3, 30, 0).unwrap());
  }

  #[test]
  fn bad_job_time_is_rejected() {
    let config = ServerConfig { daily_job_at: "midnight".into(), ..ServerConfig::default() };
    assert!(config.job_time().is_err());
  }

  #[test]
  fn tilde_expands_to_home() {
    let plain = Path::new("/var/lib/countrydle.db");
    assert_eq!(expand_tilde(plain), plain);
    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(
        expand_tilde(Path::new("~/countrydle.db")),
        PathBuf::from(home).join("countrydle.db")
      );
    }
  }
}
