//! Daily run composition
//!
//! One scheduler-driven pass per user per day: ingest the day's raw export
//! into a snapshot, upsert a deterministic early-warning alert, then generate
//! the AI brief and escalate elevated risk. Each step's outcome is captured
//! in the result instead of aborting the whole run; an external scheduler
//! iterates users sequentially and calls this once per user.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::error::{HealthError, Result};
use crate::garmin::{pick_metrics, read_garmin_json_for_day};
use crate::insights::detect_early_warning;
use crate::llm::Summarizer;
use crate::models::{Risk, SnapshotInput};
use crate::store::Store;

/// Alert title for an escalated brief. Fixed so reruns update instead of
/// duplicating.
pub const BRIEF_ALERT_TITLE: &str = "AI brief: risiko";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
  SnapshotOnly,
  SnapshotAndBrief,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
  pub ok: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl StepOutcome {
  fn ok() -> Self {
    Self { ok: true, error: None }
  }

  fn failed(e: &HealthError) -> Self {
    Self { ok: false, error: Some(e.to_string()) }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserRunResult {
  pub user_id: String,
  pub day: String,
  pub snapshot: StepOutcome,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub brief: Option<StepOutcome>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub risk: Option<Risk>,
}

/// Scheduler writes get a midnight capture time so reruns for the same day
/// stay comparable.
fn midnight_utc(day: &str) -> Result<DateTime<Utc>> {
  let date = crate::dates::parse_day(day)?;
  let naive = date
    .and_hms_opt(0, 0, 0)
    .ok_or_else(|| HealthError::InvalidInput(format!("bad day string: {day}")))?;
  Ok(Utc.from_utc_datetime(&naive))
}

async fn ingest_snapshot(
  store: &impl Store,
  config: &Config,
  user_id: &str,
  day: &str,
) -> Result<()> {
  let payload = read_garmin_json_for_day(&config.garmin_data_dir, day).await?;
  let metrics = pick_metrics(&payload);

  store
    .create_snapshot(
      user_id,
      SnapshotInput {
        day: day.to_string(),
        taken_at: midnight_utc(day)?,
        metrics,
        raw_json: Some(payload),
      },
    )
    .await?;
  Ok(())
}

/// Run the daily pipeline for one user. Snapshot failure short-circuits (no
/// data means nothing downstream can run); alert upsert failures are logged
/// but never fail the run.
pub async fn run_daily_for_user(
  store: &impl Store,
  summarizer: &impl Summarizer,
  config: &Config,
  user_id: &str,
  day: &str,
  mode: RunMode,
) -> UserRunResult {
  let mut result = UserRunResult {
    user_id: user_id.to_string(),
    day: day.to_string(),
    snapshot: StepOutcome::ok(),
    brief: None,
    risk: None,
  };

  if let Err(e) = ingest_snapshot(store, config, user_id, day).await {
    log::warn!("daily_run user={user_id} day={day} step=snapshot err={e}");
    result.snapshot = StepOutcome::failed(&e);
    return result;
  }
  log::info!("daily_run user={user_id} day={day} step=snapshot ok");

  match detect_early_warning(store, user_id, day).await {
    Ok(warning) => {
      if let Some(signal) = warning.fired() {
        if let Err(e) = store
          .upsert_alert(user_id, day, signal.severity, &signal.title, &signal.body)
          .await
        {
          log::warn!("daily_run user={user_id} day={day} step=early_warning alert err={e}");
        }
      }
    }
    Err(e) => log::warn!("daily_run user={user_id} day={day} step=early_warning err={e}"),
  }

  if mode == RunMode::SnapshotOnly {
    return result;
  }

  match crate::brief::generate_brief(store, summarizer, user_id, day).await {
    Ok(generated) => {
      result.brief = Some(StepOutcome::ok());
      result.risk = Some(generated.risk);
      log::info!("daily_run user={user_id} day={day} step=brief ok risk={}", generated.risk);

      if generated.risk.is_elevated() {
        if let Err(e) = store
          .upsert_alert(user_id, day, generated.risk, BRIEF_ALERT_TITLE, &generated.brief.short)
          .await
        {
          log::warn!("daily_run user={user_id} day={day} step=brief alert err={e}");
        }
      }
    }
    Err(e) => {
      log::warn!("daily_run user={user_id} day={day} step=brief err={e}");
      result.brief = Some(StepOutcome::failed(&e));
    }
  }

  result
}

/// Delete a snapshot, then reconcile the day's brief against the remaining
/// data: regenerate immediately, and when regeneration fails (zero snapshots
/// left, upstream down) clear the stale brief. "No brief" beats "stale brief".
pub async fn delete_snapshot_and_refresh(
  store: &impl Store,
  summarizer: &impl Summarizer,
  user_id: &str,
  snapshot_id: &str,
) -> Result<()> {
  let snap = store
    .get_snapshot(user_id, snapshot_id)
    .await?
    .ok_or_else(|| HealthError::NotFound(format!("snapshot {snapshot_id}")))?;
  let day = snap.day;

  store.delete_snapshot(user_id, snapshot_id).await?;

  if let Err(e) = crate::brief::generate_brief(store, summarizer, user_id, &day).await {
    log::info!("brief_refresh user={user_id} day={day} regenerate failed, clearing: {e}");
    store.delete_brief(user_id, &day).await?;
  }

  Ok(())
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::Store;
  use crate::test_utils::{seed_snapshot, setup_test_store, vitals, FailingSummarizer, StubSummarizer};
  use std::path::PathBuf;

  /// Unique temp dir holding one garmin export file for the day.
  async fn garmin_dir_with(day: &str, payload: &serde_json::Value) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("garmin-test-{}", uuid::Uuid::new_v4()));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    tokio::fs::write(dir.join(format!("garmin-{day}.json")), payload.to_string())
      .await
      .unwrap();
    dir
  }

  fn config_with_garmin_dir(dir: PathBuf) -> Config {
    Config {
      database_url: None,
      use_file_store: true,
      data_dir: PathBuf::from(".data"),
      garmin_data_dir: dir,
      openai_api_key: None,
      openai_model: "gpt-4o-mini".to_string(),
    }
  }

  #[tokio::test]
  async fn test_run_ingests_and_generates_brief() {
    let store = setup_test_store().await;
    let day = "2024-05-15";
    let dir = garmin_dir_with(day, &serde_json::json!({ "steps": 9000, "restingHr": 58 })).await;
    let config = config_with_garmin_dir(dir);

    let stub = StubSummarizer::ok_brief("MED", "Tag det roligt i dag");
    let result = run_daily_for_user(&store, &stub, &config, "u1", day, RunMode::SnapshotAndBrief).await;

    assert!(result.snapshot.ok);
    assert!(result.brief.as_ref().unwrap().ok);
    assert_eq!(result.risk, Some(Risk::Med));

    let snaps = store.list_snapshots_by_day("u1", day).await.unwrap();
    assert_eq!(snaps.len(), 1);
    assert_eq!(snaps[0].metrics.steps, Some(9000.0));

    let brief = store.get_brief("u1", day).await.unwrap().unwrap();
    assert_eq!(brief.risk, Risk::Med);

    // MED escalates into the fixed-title alert.
    let alerts = store.list_alerts("u1", 10).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].title, BRIEF_ALERT_TITLE);
    assert_eq!(alerts[0].body, "Tag det roligt i dag");
  }

  #[tokio::test]
  async fn test_run_snapshot_only_skips_brief() {
    let store = setup_test_store().await;
    let day = "2024-05-15";
    let dir = garmin_dir_with(day, &serde_json::json!({ "steps": 9000 })).await;
    let config = config_with_garmin_dir(dir);

    let result =
      run_daily_for_user(&store, &FailingSummarizer, &config, "u1", day, RunMode::SnapshotOnly).await;

    assert!(result.snapshot.ok);
    assert!(result.brief.is_none());
    assert!(store.get_brief("u1", day).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_run_missing_export_file_short_circuits() {
    let store = setup_test_store().await;
    let dir = std::env::temp_dir().join(format!("garmin-test-{}", uuid::Uuid::new_v4()));
    let config = config_with_garmin_dir(dir);

    let stub = StubSummarizer::ok_brief("OK", "x");
    let result =
      run_daily_for_user(&store, &stub, &config, "u1", "2024-05-15", RunMode::SnapshotAndBrief).await;

    assert!(!result.snapshot.ok);
    assert!(result.brief.is_none());
    assert!(store.list_snapshots_by_day("u1", "2024-05-15").await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_run_ok_risk_creates_no_alert() {
    let store = setup_test_store().await;
    let day = "2024-05-15";
    let dir = garmin_dir_with(day, &serde_json::json!({ "steps": 9000 })).await;
    let config = config_with_garmin_dir(dir);

    let stub = StubSummarizer::ok_brief("OK", "Alt vel");
    run_daily_for_user(&store, &stub, &config, "u1", day, RunMode::SnapshotAndBrief).await;

    assert!(store.list_alerts("u1", 10).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_delete_last_snapshot_clears_stale_brief() {
    let store = setup_test_store().await;
    let day = "2024-05-15";
    let snap = seed_snapshot(&store, "u1", day, vitals(58.0, 20.0, 50.0, 7.5, 8000.0)).await;

    let stub = StubSummarizer::ok_brief("LOW", "Fin dag");
    crate::brief::generate_brief(&store, &stub, "u1", day).await.unwrap();
    assert!(store.get_brief("u1", day).await.unwrap().is_some());

    // Deleting the only snapshot makes regeneration fail with NoSnapshots,
    // which must clear the brief rather than leave it stale.
    delete_snapshot_and_refresh(&store, &stub, "u1", &snap.id).await.unwrap();
    assert!(store.get_brief("u1", day).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_delete_with_remaining_data_regenerates() {
    let store = setup_test_store().await;
    let day = "2024-05-15";
    let first = seed_snapshot(&store, "u1", day, vitals(58.0, 20.0, 50.0, 7.5, 8000.0)).await;
    crate::test_utils::seed_snapshot_at(&store, "u1", day, 12, vitals(60.0, 25.0, 45.0, 7.0, 9000.0))
      .await;

    let stub = StubSummarizer::ok_brief("LOW", "Fin dag");
    crate::brief::generate_brief(&store, &stub, "u1", day).await.unwrap();

    delete_snapshot_and_refresh(&store, &stub, "u1", &first.id).await.unwrap();

    // One snapshot remains, so the brief was regenerated, not cleared.
    let brief = store.get_brief("u1", day).await.unwrap().unwrap();
    assert_eq!(brief.short, "Fin dag");
  }

  #[tokio::test]
  async fn test_delete_unknown_snapshot_is_not_found() {
    let store = setup_test_store().await;
    let stub = StubSummarizer::ok_brief("OK", "x");
    let err = delete_snapshot_and_refresh(&store, &stub, "u1", "nope").await.unwrap_err();
    assert!(matches!(err, HealthError::NotFound(_)));
  }
}
