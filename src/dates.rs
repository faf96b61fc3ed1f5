//! Day boundary & calendar utility
//!
//! Every day-keyed lookup in the crate uses a canonical "YYYY-MM-DD" string
//! rendered in one fixed timezone, never a raw timestamp. Offsets are computed
//! with pure calendar arithmetic so a DST transition can never skip or
//! duplicate a day.

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;

/// The product's home region. All calendar days are rendered here regardless
/// of server locale.
pub const HOME_TZ: Tz = chrono_tz::Europe::Copenhagen;

const DAY_FMT: &str = "%Y-%m-%d";

/// Render an instant as a canonical calendar day in the home timezone.
pub fn ymd(instant: DateTime<Utc>) -> String {
  instant.with_timezone(&HOME_TZ).format(DAY_FMT).to_string()
}

/// Today's canonical day.
pub fn today_ymd() -> String {
  ymd(Utc::now())
}

pub fn is_valid_day(day: &str) -> bool {
  parse_day(day).is_ok()
}

pub fn parse_day(day: &str) -> Result<NaiveDate, crate::error::HealthError> {
  NaiveDate::parse_from_str(day, DAY_FMT)
    .map_err(|_| crate::error::HealthError::InvalidInput(format!("bad day string: {day}")))
}

/// Shift a canonical day by whole calendar days.
pub fn add_days_ymd(day: &str, delta: i64) -> Result<String, crate::error::HealthError> {
  let date = parse_day(day)?;
  let shifted = if delta >= 0 {
    date.checked_add_days(Days::new(delta as u64))
  } else {
    date.checked_sub_days(Days::new((-delta) as u64))
  };
  shifted
    .map(|d| d.format(DAY_FMT).to_string())
    .ok_or_else(|| crate::error::HealthError::InvalidInput(format!("day out of range: {day} {delta:+}")))
}

/// All days in [from_day, to_day] ascending. Empty when the range is inverted.
pub fn days_between(from_day: &str, to_day: &str) -> Result<Vec<String>, crate::error::HealthError> {
  let from = parse_day(from_day)?;
  let to = parse_day(to_day)?;
  let mut out = Vec::new();
  let mut cur = from;
  while cur <= to {
    out.push(cur.format(DAY_FMT).to_string());
    cur = match cur.checked_add_days(Days::new(1)) {
      Some(d) => d,
      None => break,
    };
  }
  Ok(out)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
