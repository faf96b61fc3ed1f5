//! Exposed read projections
//!
//! Multi-day trend series and the insights summary bundle. Pure projections
//! over stored snapshots and briefs; missing days are present with nulls so
//! consumers always get one point per calendar day.

use std::collections::HashMap;

use serde::Serialize;

use crate::dates::{add_days_ymd, days_between};
use crate::error::Result;
use crate::insights::{compute_sleep_debt, compute_streaks, SleepDebt, Streaks};
use crate::models::{Risk, Snapshot};
use crate::store::Store;

pub const DEFAULT_TREND_DAYS: i64 = 14;
pub const DEFAULT_SLEEP_DEBT_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
  pub day: String,
  pub steps: Option<f64>,
  pub resting_hr: Option<f64>,
  pub stress_avg: Option<f64>,
  pub sleep_hours: Option<f64>,
  pub body_battery_low: Option<f64>,
  pub risk: Option<Risk>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendSeries {
  pub from_day: String,
  pub today: String,
  pub days: i64,
  pub items: Vec<TrendPoint>,
}

/// One point per calendar day ending at `today`, latest capture per day,
/// joined with that day's brief risk. `days` clamps to 7-90, default 14.
pub async fn trend_series(
  store: &impl Store,
  user_id: &str,
  today: &str,
  days: i64,
) -> Result<TrendSeries> {
  let days = days.max(7).min(90);
  let from_day = add_days_ymd(today, -(days - 1))?;

  let snapshots = store.list_snapshots_by_range(user_id, &from_day, today).await?;
  let briefs = store.list_briefs_by_range(user_id, &from_day, today).await?;

  // Ascending input: the last capture seen for a day is its latest.
  let mut latest_by_day: HashMap<&str, &Snapshot> = HashMap::new();
  for snap in &snapshots {
    latest_by_day.insert(snap.day.as_str(), snap);
  }

  let risk_by_day: HashMap<&str, Risk> = briefs.iter().map(|b| (b.day.as_str(), b.risk)).collect();

  let mut items = Vec::with_capacity(days as usize);
  for day in days_between(&from_day, today)? {
    let snap = latest_by_day.get(day.as_str());
    items.push(TrendPoint {
      risk: risk_by_day.get(day.as_str()).copied(),
      steps: snap.and_then(|s| s.metrics.steps),
      resting_hr: snap.and_then(|s| s.metrics.resting_hr),
      stress_avg: snap.and_then(|s| s.metrics.stress_avg),
      sleep_hours: snap.and_then(|s| s.metrics.sleep_hours),
      body_battery_low: snap.and_then(|s| s.metrics.body_battery_low),
      day,
    });
  }

  Ok(TrendSeries { from_day, today: today.to_string(), days, items })
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightsSummary {
  pub day: String,
  pub tomorrow: String,
  pub sleep_debt: SleepDebt,
  pub streaks: Streaks,
}

/// Sleep debt + streaks bundle for one day. `sleep_debt_days` clamps to 1-30.
pub async fn insights_summary(
  store: &impl Store,
  user_id: &str,
  day: &str,
  sleep_debt_days: i64,
) -> Result<InsightsSummary> {
  let sleep_debt_days = sleep_debt_days.max(1).min(30);

  let sleep_debt = compute_sleep_debt(store, user_id, day, sleep_debt_days).await?;
  let streaks = compute_streaks(store, user_id, day).await?;
  let tomorrow = add_days_ymd(day, 1)?;

  Ok(InsightsSummary { day: day.to_string(), tomorrow, sleep_debt, streaks })
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
