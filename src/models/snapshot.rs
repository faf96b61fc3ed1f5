use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The canonical optional vitals extracted from one raw export payload.
/// Every field is independently optional; absence is meaningful (never zero).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetrics {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub steps: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub resting_hr: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub stress_avg: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sleep_minutes: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sleep_hours: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub body_battery_high: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub body_battery_low: Option<f64>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub spo2_avg: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub spo2_low: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub resp_avg_waking: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub resp_avg_sleep: Option<f64>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub activity_count: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub activity_minutes: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub activity_distance_km: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub activity_calories: Option<f64>,
}

/// One capture to append for a user. The raw payload is retained verbatim for
/// re-derivation and activity extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotInput {
  pub day: String,
  pub taken_at: DateTime<Utc>,
  #[serde(flatten)]
  pub metrics: SnapshotMetrics,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub raw_json: Option<serde_json::Value>,
}

/// One stored capture event. Append-only: created once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
  pub id: String,
  pub user_id: String,
  pub day: String,
  pub taken_at: DateTime<Utc>,
  pub created_at: DateTime<Utc>,
  #[serde(flatten)]
  pub metrics: SnapshotMetrics,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub raw_json: Option<serde_json::Value>,
}
