//! Test utilities and helpers for integration and unit testing
//!
//! This module provides common test infrastructure including:
//! - In-memory store setup
//! - Seed data factories
//! - Summarizer stubs
//! - Helper assertions

use chrono::{DateTime, NaiveTime, TimeZone, Utc};

use crate::error::{HealthError, Result};
use crate::llm::Summarizer;
use crate::models::{Snapshot, SnapshotInput, SnapshotMetrics};
use crate::store::{SqliteStore, Store};

/// ---------------------------------------------------------------------------
/// Store Test Utilities
/// ---------------------------------------------------------------------------

/// Create a sqlite store backed by an in-memory database.
/// Runs all migrations and returns a ready-to-use store.
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_store() -> SqliteStore {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  SqliteStore::from_pool(pool)
}

/// ---------------------------------------------------------------------------
/// Seed Data Factories
/// ---------------------------------------------------------------------------

/// A capture instant on the given day. Hour is UTC; anything before ~22:00
/// stays on the same Copenhagen calendar day.
pub fn instant_on(day: &str, hour: u32) -> DateTime<Utc> {
  let date = crate::dates::parse_day(day).expect("valid day in test");
  let time = NaiveTime::from_hms_opt(hour, 0, 0).expect("valid hour in test");
  Utc.from_utc_datetime(&date.and_time(time))
}

/// Core vitals most insight tests care about.
pub fn vitals(
  resting_hr: f64,
  stress_avg: f64,
  body_battery_low: f64,
  sleep_hours: f64,
  steps: f64,
) -> SnapshotMetrics {
  SnapshotMetrics {
    resting_hr: Some(resting_hr),
    stress_avg: Some(stress_avg),
    body_battery_low: Some(body_battery_low),
    sleep_hours: Some(sleep_hours),
    steps: Some(steps),
    ..Default::default()
  }
}

/// Insert one snapshot for a user at 10:00 UTC on the given day.
pub async fn seed_snapshot(
  store: &impl Store,
  user_id: &str,
  day: &str,
  metrics: SnapshotMetrics,
) -> Snapshot {
  seed_snapshot_at(store, user_id, day, 10, metrics).await
}

/// Insert one snapshot at a specific UTC hour on the given day.
pub async fn seed_snapshot_at(
  store: &impl Store,
  user_id: &str,
  day: &str,
  hour: u32,
  metrics: SnapshotMetrics,
) -> Snapshot {
  store
    .create_snapshot(
      user_id,
      SnapshotInput {
        day: day.to_string(),
        taken_at: instant_on(day, hour),
        metrics,
        raw_json: None,
      },
    )
    .await
    .expect("Failed to seed snapshot")
}

/// Insert a snapshot whose raw payload carries an activities array,
/// for the activity extraction paths.
pub async fn seed_snapshot_with_raw(
  store: &impl Store,
  user_id: &str,
  day: &str,
  raw_json: serde_json::Value,
) -> Snapshot {
  store
    .create_snapshot(
      user_id,
      SnapshotInput {
        day: day.to_string(),
        taken_at: instant_on(day, 10),
        metrics: SnapshotMetrics::default(),
        raw_json: Some(raw_json),
      },
    )
    .await
    .expect("Failed to seed snapshot")
}

/// ---------------------------------------------------------------------------
/// Summarizer Stubs
/// ---------------------------------------------------------------------------

/// Deterministic summarizer returning a fixed payload.
pub struct StubSummarizer {
  pub payload: serde_json::Value,
}

impl StubSummarizer {
  /// A minimal well-formed brief payload.
  pub fn ok_brief(risk: &str, short: &str) -> Self {
    Self {
      payload: serde_json::json!({
        "risk": risk,
        "short": short,
        "signals": [{ "name": "RHR", "value": "62 bpm", "why": "let forhøjet mod baseline" }],
        "suggestions": [{ "title": "Rolig dag", "detail": "Gåtur og tidlig sengetid" }],
      }),
    }
  }
}

impl Summarizer for StubSummarizer {
  async fn summarize(&self, _prompt: &str) -> Result<serde_json::Value> {
    Ok(self.payload.clone())
  }

  fn model(&self) -> &str {
    "stub"
  }
}

/// Summarizer that always fails with an upstream error.
pub struct FailingSummarizer;

impl Summarizer for FailingSummarizer {
  async fn summarize(&self, _prompt: &str) -> Result<serde_json::Value> {
    Err(HealthError::Upstream("stubbed outage".into()))
  }

  fn model(&self) -> &str {
    "stub"
  }
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_store_creates_schema() {
    let store = setup_test_store().await;

    let snap = seed_snapshot(&store, "u1", "2024-05-01", vitals(58.0, 20.0, 50.0, 7.5, 9000.0)).await;
    assert_eq!(snap.day, "2024-05-01");

    let listed = store.list_snapshots_by_day("u1", "2024-05-01").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].metrics.resting_hr, Some(58.0));
  }

  #[test]
  fn test_instant_on_stays_on_day() {
    let t = instant_on("2024-05-01", 10);
    assert_eq!(crate::dates::ymd(t), "2024-05-01");
  }

  #[tokio::test]
  async fn test_stub_summarizer_is_deterministic() {
    let stub = StubSummarizer::ok_brief("MED", "Tag det roligt i dag");
    let a = stub.summarize("x").await.unwrap();
    let b = stub.summarize("y").await.unwrap();
    assert_eq!(a, b);
    assert_eq!(a["risk"], "MED");
  }
}
