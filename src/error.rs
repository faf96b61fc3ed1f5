//! Crate-wide error taxonomy
//!
//! Reads degrade to `Option`/empty results; these variants cover the cases
//! where a caller genuinely cannot proceed.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HealthError {
  /// Malformed caller input (bad day string, out-of-range value). Always
  /// recoverable by correcting the input.
  #[error("Invalid input: {0}")]
  InvalidInput(String),

  /// A keyed record does not exist where one was explicitly required.
  #[error("Not found: {0}")]
  NotFound(String),

  /// Brief generation requires at least one snapshot for the day.
  #[error("No snapshots for day {day}")]
  NoSnapshots { day: String },

  /// Persistent store failure (sqlite error, unreadable file, ...).
  #[error("Store error: {0}")]
  Store(String),

  /// Summarizer unreachable or returned something unusable. Not retried.
  #[error("Upstream failure: {0}")]
  Upstream(String),

  #[error("Missing configuration: {0}")]
  MissingConfig(String),
}

impl From<sqlx::Error> for HealthError {
  fn from(e: sqlx::Error) -> Self {
    HealthError::Store(e.to_string())
  }
}

impl From<std::io::Error> for HealthError {
  fn from(e: std::io::Error) -> Self {
    HealthError::Store(e.to_string())
  }
}

impl From<serde_json::Error> for HealthError {
  fn from(e: serde_json::Error) -> Self {
    HealthError::Store(e.to_string())
  }
}

impl From<reqwest::Error> for HealthError {
  fn from(e: reqwest::Error) -> Self {
    HealthError::Upstream(e.to_string())
  }
}

impl Serialize for HealthError {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

pub type Result<T> = std::result::Result<T, HealthError>;
