//! Derived daily signals
//!
//! Baseline averages, sleep debt, goal streaks and the early-warning anomaly
//! check. Everything here is a pure projection over stored snapshots plus the
//! user's profile; nothing is persisted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dates::add_days_ymd;
use crate::error::Result;
use crate::models::{Risk, Snapshot};
use crate::store::Store;

pub const BASELINE_WINDOW_DAYS: i64 = 14;
pub const SLEEP_DEBT_WINDOW_DAYS: i64 = 7;
pub const STREAK_WINDOW_DAYS: i64 = 60;

/// Anomaly thresholds. Heuristic constants, all three must hold at once.
const MED_RHR_DELTA: f64 = 5.0;
const MED_STRESS_DELTA: f64 = 10.0;
const MED_BB_DELTA: f64 = -10.0;
const HIGH_RHR_DELTA: f64 = 8.0;
const HIGH_STRESS_DELTA: f64 = 15.0;
const HIGH_BB_DELTA: f64 = -15.0;

/// ---------------------------------------------------------------------------
/// Baseline
/// ---------------------------------------------------------------------------

/// Trailing-window averages of the core vitals. A field with zero contributing
/// captures is `None`, never zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Baseline {
  pub resting_hr_avg: Option<f64>,
  pub stress_avg: Option<f64>,
  pub body_battery_low_avg: Option<f64>,
  pub sleep_hours_avg: Option<f64>,
  pub steps_avg: Option<f64>,
}

fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
  let xs: Vec<f64> = values.flatten().filter(|v| v.is_finite()).collect();
  if xs.is_empty() {
    return None;
  }
  Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

/// Average each vital over every capture in `[to_day - window + 1, to_day]`.
/// Multiple captures on one day all contribute: baseline granularity is
/// per-capture, not per-day. Fields are averaged independently over present
/// values only.
pub async fn compute_baseline(
  store: &impl Store,
  user_id: &str,
  to_day: &str,
  window_days: i64,
) -> Result<Baseline> {
  let from_day = add_days_ymd(to_day, -(window_days - 1))?;
  let snaps = store.list_snapshots_by_range(user_id, &from_day, to_day).await?;

  Ok(Baseline {
    resting_hr_avg: mean(snaps.iter().map(|s| s.metrics.resting_hr)),
    stress_avg: mean(snaps.iter().map(|s| s.metrics.stress_avg)),
    body_battery_low_avg: mean(snaps.iter().map(|s| s.metrics.body_battery_low)),
    sleep_hours_avg: mean(snaps.iter().map(|s| s.metrics.sleep_hours)),
    steps_avg: mean(snaps.iter().map(|s| s.metrics.steps)),
  })
}

/// ---------------------------------------------------------------------------
/// Sleep debt
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepDebt {
  pub debt_hours: f64,
  pub avg_sleep_hours: Option<f64>,
  pub goal_hours: f64,
}

/// Cumulative shortfall against the sleep goal over `[to_day - window + 1,
/// to_day]`, floored at zero and rounded to one decimal. Sums sleep across ALL
/// captures in the window without per-day dedup, so a day with two captures
/// counts its sleep twice. Streaks dedup per day; this calculator does not.
/// The asymmetry is intentional and pinned by a test.
pub async fn compute_sleep_debt(
  store: &impl Store,
  user_id: &str,
  to_day: &str,
  window_days: i64,
) -> Result<SleepDebt> {
  let goal = store.get_profile(user_id).await?.sleep_goal_hours;

  let from_day = add_days_ymd(to_day, -(window_days - 1))?;
  let snaps = store.list_snapshots_by_range(user_id, &from_day, to_day).await?;

  let sleeps: Vec<f64> = snaps
    .iter()
    .filter_map(|s| s.metrics.sleep_hours)
    .filter(|v| v.is_finite())
    .collect();

  let avg_sleep = if sleeps.is_empty() {
    None
  } else {
    Some(sleeps.iter().sum::<f64>() / sleeps.len() as f64)
  };

  let expected = goal * window_days as f64;
  let actual: f64 = sleeps.iter().sum();
  let debt = (expected - actual).max(0.0);

  Ok(SleepDebt {
    debt_hours: (debt * 10.0).round() / 10.0,
    avg_sleep_hours: avg_sleep,
    goal_hours: goal,
  })
}

/// ---------------------------------------------------------------------------
/// Goal streaks
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Streaks {
  pub steps_streak: u32,
  pub sleep_streak: u32,
  pub steps_goal: i64,
  pub sleep_goal_hours: f64,
}

/// Latest capture per day wins for streak purposes.
fn latest_by_day(snaps: &[Snapshot]) -> HashMap<&str, &Snapshot> {
  let mut map: HashMap<&str, &Snapshot> = HashMap::new();
  for snap in snaps {
    match map.get(snap.day.as_str()) {
      Some(existing) if existing.taken_at >= snap.taken_at => {}
      _ => {
        map.insert(snap.day.as_str(), snap);
      }
    }
  }
  map
}

fn walk_streak(
  by_day: &HashMap<&str, &Snapshot>,
  to_day: &str,
  window_days: i64,
  met: impl Fn(&Snapshot) -> bool,
) -> Result<u32> {
  let mut streak = 0u32;
  let mut day = to_day.to_string();
  for _ in 0..window_days {
    match by_day.get(day.as_str()) {
      Some(snap) if met(snap) => streak += 1,
      // A missing day or a failing value ends the walk; gaps don't skip.
      _ => break,
    }
    day = add_days_ymd(&day, -1)?;
  }
  Ok(streak)
}

/// Consecutive days ending at `to_day` where steps / sleep met the profile
/// goal, over a trailing 60-day window. One value per day (the latest
/// capture); a day with no data counts as failing, not skipped.
pub async fn compute_streaks(store: &impl Store, user_id: &str, to_day: &str) -> Result<Streaks> {
  let profile = store.get_profile(user_id).await?;

  let from_day = add_days_ymd(to_day, -(STREAK_WINDOW_DAYS - 1))?;
  let snaps = store.list_snapshots_by_range(user_id, &from_day, to_day).await?;
  let by_day = latest_by_day(&snaps);

  let steps_goal = profile.steps_goal as f64;
  let sleep_goal = profile.sleep_goal_hours;

  let steps_streak = walk_streak(&by_day, to_day, STREAK_WINDOW_DAYS, |s| {
    s.metrics.steps.map(|v| v >= steps_goal).unwrap_or(false)
  })?;
  let sleep_streak = walk_streak(&by_day, to_day, STREAK_WINDOW_DAYS, |s| {
    s.metrics.sleep_hours.map(|v| v >= sleep_goal).unwrap_or(false)
  })?;

  Ok(Streaks {
    steps_streak,
    sleep_streak,
    steps_goal: profile.steps_goal,
    sleep_goal_hours: profile.sleep_goal_hours,
  })
}

/// ---------------------------------------------------------------------------
/// Early warning
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalySignal {
  pub severity: Risk,
  pub title: String,
  pub body: String,
}

/// Outcome of the anomaly check. Preconditions short-circuit with a named
/// reason instead of an error so callers can degrade gracefully.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EarlyWarning {
  Anomaly(AnomalySignal),
  Clear { reason: &'static str },
}

impl EarlyWarning {
  pub fn fired(&self) -> Option<&AnomalySignal> {
    match self {
      EarlyWarning::Anomaly(signal) => Some(signal),
      EarlyWarning::Clear { .. } => None,
    }
  }
}

/// Compare today's latest capture against the trailing 14-day baseline ending
/// yesterday. MED fires when RHR is up ≥5 bpm AND stress up ≥10 AND body
/// battery low down ≥10; HIGH at 8/15/15 and supersedes MED. Conjunctive: one
/// missed term means no anomaly.
pub async fn detect_early_warning(
  store: &impl Store,
  user_id: &str,
  day: &str,
) -> Result<EarlyWarning> {
  let today = store.list_snapshots_by_day(user_id, day).await?;
  let Some(latest) = today.last() else {
    return Ok(EarlyWarning::Clear { reason: "no_snapshot" });
  };

  let prev_day = add_days_ymd(day, -1)?;
  let base = compute_baseline(store, user_id, &prev_day, BASELINE_WINDOW_DAYS).await?;
  let (Some(base_rhr), Some(base_stress), Some(base_bb)) =
    (base.resting_hr_avg, base.stress_avg, base.body_battery_low_avg)
  else {
    return Ok(EarlyWarning::Clear { reason: "insufficient_baseline" });
  };

  let (Some(rhr), Some(stress), Some(bb_low)) = (
    latest.metrics.resting_hr,
    latest.metrics.stress_avg,
    latest.metrics.body_battery_low,
  ) else {
    return Ok(EarlyWarning::Clear { reason: "missing_metrics" });
  };

  let rhr_delta = rhr - base_rhr;
  let stress_delta = stress - base_stress;
  let bb_delta = bb_low - base_bb;

  let med = rhr_delta >= MED_RHR_DELTA && stress_delta >= MED_STRESS_DELTA && bb_delta <= MED_BB_DELTA;
  let high =
    rhr_delta >= HIGH_RHR_DELTA && stress_delta >= HIGH_STRESS_DELTA && bb_delta <= HIGH_BB_DELTA;

  if !med && !high {
    return Ok(EarlyWarning::Clear { reason: "no_anomaly" });
  }

  let severity = if high { Risk::High } else { Risk::Med };

  let title = "Tidlig advarsel: mulig belastning".to_string();
  let body = format!(
    "Dagens tal afviger fra din 14-dages baseline: RHR +{} bpm, stress +{}, body battery low {}. \
     Overvej at tage det roligt i dag (gåtur, tidligt i seng, ekstra væske, mindre koffein).",
    rhr_delta.round() as i64,
    stress_delta.round() as i64,
    bb_delta.round() as i64,
  );

  Ok(EarlyWarning::Anomaly(AnomalySignal { severity, title, body }))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
