use serde::{Deserialize, Serialize};

/// An exercise event extracted from a snapshot's raw payload. Not separately
/// persisted; recomputed on each read from the snapshots in the lookback
/// window. Identity key: source id when present, else `start:<startTime>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
  pub id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start_time: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub activity_type: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration_minutes: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub distance_km: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub calories: Option<f64>,
}
