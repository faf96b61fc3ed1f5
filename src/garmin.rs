//! Snapshot normalizer for raw Garmin-style export payloads
//!
//! Export payloads vary across source versions: values live at the top level,
//! under `stats`, under `wellness`, or inside nested metric objects, and
//! numbers sometimes arrive as strings. Each metric is resolved through its own
//! chain of candidate paths; extraction of one field never fails another.
//! Non-finite or non-numeric values normalize to absent, never to zero.

use std::path::Path;

use serde_json::Value;

use crate::error::{HealthError, Result};
use crate::models::{Activity, SnapshotMetrics};

/// ---------------------------------------------------------------------------
/// Tolerant value resolution
/// ---------------------------------------------------------------------------

/// Coerce a JSON value to a finite f64. Accepts numbers and numeric-looking
/// strings; everything else is absent.
fn coerce_num(v: &Value) -> Option<f64> {
  let n = match v {
    Value::Number(n) => n.as_f64()?,
    Value::String(s) => s.trim().parse::<f64>().ok()?,
    _ => return None,
  };
  n.is_finite().then_some(n)
}

fn get_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
  let mut cur = root;
  for key in path {
    cur = cur.get(key)?;
  }
  Some(cur)
}

/// Walk candidate paths in order; first path that yields a finite number wins.
fn resolve_num(root: &Value, paths: &[&[&str]]) -> Option<f64> {
  paths.iter().find_map(|p| get_path(root, p).and_then(coerce_num))
}

fn resolve_str<'a>(root: &'a Value, paths: &[&[&str]]) -> Option<&'a str> {
  paths.iter().find_map(|p| get_path(root, p).and_then(Value::as_str))
}

/// ---------------------------------------------------------------------------
/// Metric extraction
/// ---------------------------------------------------------------------------

/// Map one raw export payload to the canonical metric set.
pub fn pick_metrics(payload: &Value) -> SnapshotMetrics {
  let steps = resolve_num(payload, &[&["steps"], &["dailySteps"], &["stats", "totalSteps"]]);

  let resting_hr = resolve_num(
    payload,
    &[
      &["restingHeartRate"],
      &["restingHr"],
      &["stats", "restingHeartRate"],
      &["wellness", "restingHeartRate"],
      &["heartRates", "resting"],
    ],
  );

  let stress_avg = resolve_num(
    payload,
    &[
      &["stressAvg"],
      &["stress", "avg"],
      &["stress", "avgStressLevel"],
      &["stats", "averageStressLevel"],
    ],
  );

  // Prefer the already-converted minutes field, else derive from seconds.
  let sleep_minutes = resolve_num(payload, &[&["sleepMinutes"]]).or_else(|| {
    resolve_num(
      payload,
      &[&["sleep", "sleepTimeSeconds"], &["stats", "measurableAsleepDuration"]],
    )
    .map(|secs| secs / 60.0)
  });
  let sleep_hours = sleep_minutes.map(|m| m / 60.0);

  let body_battery_high = resolve_num(
    payload,
    &[
      &["bodyBatteryHigh"],
      &["bodyBattery", "high"],
      &["stats", "bodyBatteryHighestValue"],
    ],
  );
  let body_battery_low = resolve_num(
    payload,
    &[
      &["bodyBatteryLow"],
      &["bodyBattery", "low"],
      &["stats", "bodyBatteryLowestValue"],
    ],
  );

  let spo2_avg = resolve_num(
    payload,
    &[&["spo2Avg"], &["spo2", "avg"], &["spo2", "averageSpO2"], &["stats", "averageSpo2"]],
  );
  let spo2_low = resolve_num(
    payload,
    &[&["spo2Low"], &["spo2", "low"], &["spo2", "lowestSpO2"], &["stats", "lowestSpo2"]],
  );

  let resp_avg_waking = resolve_num(
    payload,
    &[
      &["respiration", "avgWaking"],
      &["respiration", "avgWakingRespirationValue"],
      &["stats", "avgWakingRespirationValue"],
    ],
  );
  let resp_avg_sleep = resolve_num(
    payload,
    &[
      &["respiration", "avgSleep"],
      &["respiration", "avgSleepRespirationValue"],
      &["stats", "avgSleepRespirationValue"],
    ],
  );

  let acts = raw_activities(payload);

  let activity_count = (!acts.is_empty()).then_some(acts.len() as i64);
  let activity_minutes = sum_over(&acts, |a| {
    resolve_num(a, &[&["durationMinutes"], &["durationMin"]])
      .or_else(|| resolve_num(a, &[&["duration"], &["durationSeconds"]]).map(|s| s / 60.0))
  });
  let activity_distance_km = sum_over(&acts, |a| {
    resolve_num(a, &[&["distanceKm"], &["distance_km"]])
      .or_else(|| resolve_num(a, &[&["distance"], &["distanceMeters"]]).map(|m| m / 1000.0))
  });
  let activity_calories = sum_over(&acts, |a| resolve_num(a, &[&["calories"], &["activeCalories"]]));

  SnapshotMetrics {
    steps,
    resting_hr,
    stress_avg,
    sleep_minutes,
    sleep_hours,
    body_battery_high,
    body_battery_low,
    spo2_avg,
    spo2_low,
    resp_avg_waking,
    resp_avg_sleep,
    activity_count,
    activity_minutes,
    activity_distance_km,
    activity_calories,
  }
}

/// The embedded activity array goes by two names depending on export version.
pub fn raw_activities(payload: &Value) -> Vec<&Value> {
  ["activities", "activityList"]
    .iter()
    .find_map(|k| payload.get(*k).and_then(Value::as_array))
    .map(|arr| arr.iter().collect())
    .unwrap_or_default()
}

fn sum_over(acts: &[&Value], f: impl Fn(&Value) -> Option<f64>) -> Option<f64> {
  let vals: Vec<f64> = acts.iter().filter_map(|a| f(a)).collect();
  (!vals.is_empty()).then(|| vals.iter().sum())
}

/// ---------------------------------------------------------------------------
/// Activity extraction
/// ---------------------------------------------------------------------------

/// Map one raw activity object to a canonical Activity. Returns None when the
/// activity has neither a source id nor a start time (nothing to key it by).
pub fn normalize_activity(raw: &Value) -> Option<Activity> {
  if !raw.is_object() {
    return None;
  }

  let id = [&["activityId"][..], &["id"], &["activity_id"]]
    .iter()
    .find_map(|p| {
      let v = get_path(raw, p)?;
      match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
      }
    });

  let start_time = resolve_str(raw, &[&["startTimeLocal"], &["startTime"]]).map(str::to_string);

  if id.is_none() && start_time.is_none() {
    return None;
  }

  let name = resolve_str(raw, &[&["activityName"], &["name"]]).map(str::to_string);
  let activity_type =
    resolve_str(raw, &[&["activityType"], &["activityType", "typeKey"]]).map(str::to_string);

  let duration_minutes = resolve_num(raw, &[&["durationMinutes"], &["durationMin"]]).or_else(|| {
    resolve_num(raw, &[&["duration"], &["durationSeconds"], &["durationInSeconds"]]).map(|s| s / 60.0)
  });

  let distance_km = resolve_num(raw, &[&["distanceKm"], &["distance_km"]])
    .or_else(|| resolve_num(raw, &[&["distance"], &["distanceMeters"]]).map(|m| m / 1000.0));

  let calories = resolve_num(raw, &[&["calories"], &["activeKilocalories"]]);

  let id = id.unwrap_or_else(|| format!("start:{}", start_time.as_deref().unwrap_or_default()));

  Some(Activity {
    id,
    start_time,
    name,
    activity_type,
    duration_minutes,
    distance_km,
    calories,
  })
}

/// ---------------------------------------------------------------------------
/// Local raw source
/// ---------------------------------------------------------------------------

/// Read the export pipeline's JSON file for one day.
pub async fn read_garmin_json_for_day(dir: &Path, day: &str) -> Result<Value> {
  let file = dir.join(format!("garmin-{day}.json"));
  let bytes = tokio::fs::read(&file)
    .await
    .map_err(|e| HealthError::NotFound(format!("missing garmin file {}: {e}", file.display())))?;
  serde_json::from_slice(&bytes)
    .map_err(|e| HealthError::InvalidInput(format!("unparseable garmin file {}: {e}", file.display())))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
