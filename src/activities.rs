//! Activity extraction and activity-type streaks
//!
//! Activities are never persisted on their own; they are re-extracted from the
//! raw payloads of recent snapshots on every read, deduplicated by identity
//! key, over a bounded scan window.

use std::collections::HashSet;

use serde::Serialize;

use crate::dates::{add_days_ymd, days_between, is_valid_day};
use crate::error::Result;
use crate::garmin::{normalize_activity, raw_activities};
use crate::models::Activity;
use crate::store::Store;

/// Bound on how many snapshots one extraction scans, newest first.
const SNAPSHOT_SCAN_CAP: usize = 120;

pub const DEFAULT_RECENT_LIMIT: usize = 10;
pub const DEFAULT_RECENT_DAYS: i64 = 14;
pub const DEFAULT_STREAK_DAYS: i64 = 60;

fn clamp(n: i64, min: i64, max: i64) -> i64 {
  n.max(min).min(max)
}

/// ---------------------------------------------------------------------------
/// Recent activities
/// ---------------------------------------------------------------------------

/// Most recent activities extracted from snapshot payloads, newest snapshots
/// first, deduplicated by activity id. `limit` clamps to 1-50, `days` to 1-90.
pub async fn recent_activities(
  store: &impl Store,
  user_id: &str,
  today: &str,
  limit: usize,
  days: i64,
) -> Result<Vec<Activity>> {
  let limit = limit.clamp(1, 50);
  let days = clamp(days, 1, 90);

  let from_day = add_days_ymd(today, -(days - 1))?;
  let snaps = store.list_snapshots_by_range(user_id, &from_day, today).await?;

  let mut seen: HashSet<String> = HashSet::new();
  let mut out: Vec<Activity> = Vec::new();

  for snap in snaps.iter().rev().take(SNAPSHOT_SCAN_CAP) {
    let Some(payload) = &snap.raw_json else { continue };

    for raw in raw_activities(payload) {
      let Some(act) = normalize_activity(raw) else { continue };
      if !seen.insert(act.id.clone()) {
        continue;
      }
      out.push(act);
      if out.len() >= limit {
        return Ok(out);
      }
    }
  }

  Ok(out)
}

/// ---------------------------------------------------------------------------
/// Activity-type streaks
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityBucket {
  Walk,
  Run,
  Strength,
}

/// Classify a free-text activity type. Export type keys vary; substring match
/// keeps it robust.
pub fn bucket_type(raw: &str) -> Option<ActivityBucket> {
  let s = raw.to_lowercase();
  if s.contains("walk") {
    return Some(ActivityBucket::Walk);
  }
  if s.contains("run") {
    return Some(ActivityBucket::Run);
  }
  if s.contains("strength") || s.contains("weight") || s.contains("gym") {
    return Some(ActivityBucket::Strength);
  }
  None
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeStreak {
  pub current: u32,
  pub longest: u32,
  pub last_day_had: Option<String>,
}

/// Current streak counts backward from the window's last day; longest is the
/// maximal run anywhere in the window.
pub fn streaks_from_flags(days_asc: &[String], flags: &HashSet<String>) -> TypeStreak {
  let mut longest = 0u32;
  let mut run = 0u32;
  let mut last_day_had: Option<String> = None;

  for day in days_asc {
    if flags.contains(day) {
      run += 1;
      last_day_had = Some(day.clone());
      longest = longest.max(run);
    } else {
      run = 0;
    }
  }

  let mut current = 0u32;
  for day in days_asc.iter().rev() {
    if flags.contains(day) {
      current += 1;
    } else {
      break;
    }
  }

  TypeStreak { current, longest, last_day_had }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityStreaks {
  pub from_day: String,
  pub today: String,
  pub days: i64,
  pub walk: TypeStreak,
  pub run: TypeStreak,
  pub strength: TypeStreak,
}

/// The activity's calendar day is the date prefix of its local start time.
fn activity_day(act: &Activity) -> Option<&str> {
  let start = act.start_time.as_deref()?;
  let day = start.get(..10)?;
  is_valid_day(day).then_some(day)
}

/// Per-bucket day-presence streaks over a trailing window. `days` clamps to
/// 7-180, default 60.
pub async fn activity_streaks(
  store: &impl Store,
  user_id: &str,
  today: &str,
  days: i64,
) -> Result<ActivityStreaks> {
  let days = clamp(days, 7, 180);
  let from_day = add_days_ymd(today, -(days - 1))?;

  let snaps = store.list_snapshots_by_range(user_id, &from_day, today).await?;

  let mut walk_days: HashSet<String> = HashSet::new();
  let mut run_days: HashSet<String> = HashSet::new();
  let mut strength_days: HashSet<String> = HashSet::new();

  for snap in snaps.iter().rev().take(SNAPSHOT_SCAN_CAP) {
    let Some(payload) = &snap.raw_json else { continue };

    for raw in raw_activities(payload) {
      let Some(act) = normalize_activity(raw) else { continue };
      let Some(day) = activity_day(&act) else { continue };
      if day < from_day.as_str() || day > today {
        continue;
      }
      let Some(bucket) = act.activity_type.as_deref().and_then(bucket_type) else { continue };

      let set = match bucket {
        ActivityBucket::Walk => &mut walk_days,
        ActivityBucket::Run => &mut run_days,
        ActivityBucket::Strength => &mut strength_days,
      };
      set.insert(day.to_string());
    }
  }

  let days_asc = days_between(&from_day, today)?;

  Ok(ActivityStreaks {
    walk: streaks_from_flags(&days_asc, &walk_days),
    run: streaks_from_flags(&days_asc, &run_days),
    strength: streaks_from_flags(&days_asc, &strength_days),
    from_day,
    today: today.to_string(),
    days,
  })
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
