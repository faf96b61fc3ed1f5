//! Environment-driven configuration
//!
//! Everything tunable at deploy time comes from the environment (optionally a
//! .env file loaded by the binary). Missing values fall back to defaults that
//! work for a single-user local setup.

use std::env;
use std::path::PathBuf;

use crate::error::{HealthError, Result};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct Config {
  /// Sqlite connection string. Absent -> file store.
  pub database_url: Option<String>,
  /// Force the file store even when a database is configured.
  pub use_file_store: bool,
  /// Root directory for the file store backend.
  pub data_dir: PathBuf,
  /// Directory the export pipeline writes garmin-YYYY-MM-DD.json files to.
  pub garmin_data_dir: PathBuf,
  pub openai_api_key: Option<String>,
  pub openai_model: String,
}

impl Config {
  pub fn from_env() -> Self {
    let data_dir = env::var("HEALTH_TREND_DATA_DIR")
      .map(PathBuf::from)
      .unwrap_or_else(|_| PathBuf::from(".data"));

    let garmin_data_dir = env::var("GARMIN_DATA_DIR")
      .map(PathBuf::from)
      .unwrap_or_else(|_| data_dir.join("garmin"));

    Self {
      database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
      use_file_store: env::var("USE_FILE_STORE").map(|v| v == "1").unwrap_or(false),
      data_dir,
      garmin_data_dir,
      openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|s| !s.is_empty()),
      openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.to_string()),
    }
  }

  pub fn require_openai_key(&self) -> Result<&str> {
    self
      .openai_api_key
      .as_deref()
      .ok_or_else(|| HealthError::MissingConfig("OPENAI_API_KEY".into()))
  }
}
