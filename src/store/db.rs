//! Sqlite backend

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

use super::Store;
use crate::error::{HealthError, Result};
use crate::models::{
  AiBrief, Alert, BriefInput, ManualDaily, ManualInput, ProfilePatch, Risk, Snapshot,
  SnapshotInput, SnapshotMetrics, UserProfile,
};

pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Connect and run migrations.
  pub async fn connect(url: &str) -> Result<Self> {
    let pool = SqlitePoolOptions::new().max_connections(5).connect(url).await?;
    sqlx::migrate!("./migrations")
      .run(&pool)
      .await
      .map_err(|e| HealthError::Store(e.to_string()))?;
    Ok(Self { pool })
  }

  pub fn from_pool(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Fast connectivity probe used for backend selection.
  pub async fn ping(&self) -> Result<()> {
    sqlx::query("SELECT 1").execute(&self.pool).await?;
    Ok(())
  }
}

/// ---------------------------------------------------------------------------
/// Row mapping
/// ---------------------------------------------------------------------------

fn snapshot_from_row(row: &SqliteRow) -> Result<Snapshot> {
  let raw_json: Option<String> = row.try_get("raw_json")?;
  let raw_json = match raw_json {
    Some(s) => Some(serde_json::from_str(&s)?),
    None => None,
  };

  Ok(Snapshot {
    id: row.try_get("id")?,
    user_id: row.try_get("user_id")?,
    day: row.try_get("day")?,
    taken_at: row.try_get("taken_at")?,
    created_at: row.try_get("created_at")?,
    metrics: SnapshotMetrics {
      steps: row.try_get("steps")?,
      resting_hr: row.try_get("resting_hr")?,
      stress_avg: row.try_get("stress_avg")?,
      sleep_minutes: row.try_get("sleep_minutes")?,
      sleep_hours: row.try_get("sleep_hours")?,
      body_battery_high: row.try_get("body_battery_high")?,
      body_battery_low: row.try_get("body_battery_low")?,
      spo2_avg: row.try_get("spo2_avg")?,
      spo2_low: row.try_get("spo2_low")?,
      resp_avg_waking: row.try_get("resp_avg_waking")?,
      resp_avg_sleep: row.try_get("resp_avg_sleep")?,
      activity_count: row.try_get("activity_count")?,
      activity_minutes: row.try_get("activity_minutes")?,
      activity_distance_km: row.try_get("activity_distance_km")?,
      activity_calories: row.try_get("activity_calories")?,
    },
    raw_json,
  })
}

fn risk_from_column(s: &str) -> Result<Risk> {
  Risk::parse(s).ok_or_else(|| HealthError::Store(format!("unknown risk value in store: {s}")))
}

fn brief_from_row(row: &SqliteRow) -> Result<AiBrief> {
  let risk: String = row.try_get("risk")?;
  let signals: String = row.try_get("signals")?;
  let suggestions: String = row.try_get("suggestions")?;

  Ok(AiBrief {
    id: row.try_get("id")?,
    user_id: row.try_get("user_id")?,
    day: row.try_get("day")?,
    risk: risk_from_column(&risk)?,
    short: row.try_get("short")?,
    signals: serde_json::from_str(&signals)?,
    suggestions: serde_json::from_str(&suggestions)?,
    model: row.try_get("model")?,
    created_at: row.try_get("created_at")?,
    updated_at: row.try_get("updated_at")?,
  })
}

fn alert_from_row(row: &SqliteRow) -> Result<Alert> {
  let severity: String = row.try_get("severity")?;
  Ok(Alert {
    id: row.try_get("id")?,
    user_id: row.try_get("user_id")?,
    day: row.try_get("day")?,
    severity: risk_from_column(&severity)?,
    title: row.try_get("title")?,
    body: row.try_get("body")?,
    created_at: row.try_get("created_at")?,
    updated_at: row.try_get("updated_at")?,
  })
}

fn profile_from_row(row: &SqliteRow) -> Result<UserProfile> {
  Ok(UserProfile {
    user_id: row.try_get("user_id")?,
    steps_goal: row.try_get("steps_goal")?,
    sleep_goal_hours: row.try_get("sleep_goal_hours")?,
    sex: row.try_get("sex")?,
    pregnant: row.try_get("pregnant")?,
    cycle_day: row.try_get("cycle_day")?,
  })
}

fn manual_from_row(row: &SqliteRow) -> Result<ManualDaily> {
  Ok(ManualDaily {
    user_id: row.try_get("user_id")?,
    day: row.try_get("day")?,
    symptom_score: row.try_get("symptom_score")?,
    caffeine_cups: row.try_get("caffeine_cups")?,
    alcohol_units: row.try_get("alcohol_units")?,
    notes: row.try_get("notes")?,
    trained: row.try_get("trained")?,
    meds: row.try_get("meds")?,
    updated_at: row.try_get("updated_at")?,
  })
}

/// ---------------------------------------------------------------------------
/// Store impl
/// ---------------------------------------------------------------------------

impl Store for SqliteStore {
  async fn create_snapshot(&self, user_id: &str, input: SnapshotInput) -> Result<Snapshot> {
    if !crate::dates::is_valid_day(&input.day) {
      return Err(HealthError::InvalidInput(format!("bad day string: {}", input.day)));
    }

    let id = Uuid::new_v4().to_string();
    let created_at: DateTime<Utc> = Utc::now();
    let raw_json = input.raw_json.as_ref().map(serde_json::to_string).transpose()?;
    let m = &input.metrics;

    sqlx::query(
      r#"
      INSERT INTO snapshots (
        id, user_id, day, taken_at, created_at,
        steps, resting_hr, stress_avg, sleep_minutes, sleep_hours,
        body_battery_high, body_battery_low, spo2_avg, spo2_low,
        resp_avg_waking, resp_avg_sleep,
        activity_count, activity_minutes, activity_distance_km, activity_calories,
        raw_json
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)
      "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(&input.day)
    .bind(input.taken_at)
    .bind(created_at)
    .bind(m.steps)
    .bind(m.resting_hr)
    .bind(m.stress_avg)
    .bind(m.sleep_minutes)
    .bind(m.sleep_hours)
    .bind(m.body_battery_high)
    .bind(m.body_battery_low)
    .bind(m.spo2_avg)
    .bind(m.spo2_low)
    .bind(m.resp_avg_waking)
    .bind(m.resp_avg_sleep)
    .bind(m.activity_count)
    .bind(m.activity_minutes)
    .bind(m.activity_distance_km)
    .bind(m.activity_calories)
    .bind(raw_json)
    .execute(&self.pool)
    .await?;

    Ok(Snapshot {
      id,
      user_id: user_id.to_string(),
      day: input.day,
      taken_at: input.taken_at,
      created_at,
      metrics: input.metrics,
      raw_json: input.raw_json,
    })
  }

  async fn get_snapshot(&self, user_id: &str, id: &str) -> Result<Option<Snapshot>> {
    let row = sqlx::query("SELECT * FROM snapshots WHERE user_id = ?1 AND id = ?2")
      .bind(user_id)
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    row.as_ref().map(snapshot_from_row).transpose()
  }

  async fn list_snapshots_by_day(&self, user_id: &str, day: &str) -> Result<Vec<Snapshot>> {
    let rows = sqlx::query(
      "SELECT * FROM snapshots WHERE user_id = ?1 AND day = ?2 ORDER BY taken_at ASC",
    )
    .bind(user_id)
    .bind(day)
    .fetch_all(&self.pool)
    .await?;
    rows.iter().map(snapshot_from_row).collect()
  }

  async fn list_snapshots_by_range(
    &self,
    user_id: &str,
    from_day: &str,
    to_day: &str,
  ) -> Result<Vec<Snapshot>> {
    let rows = sqlx::query(
      r#"
      SELECT * FROM snapshots
      WHERE user_id = ?1 AND day >= ?2 AND day <= ?3
      ORDER BY day ASC, taken_at ASC
      "#,
    )
    .bind(user_id)
    .bind(from_day)
    .bind(to_day)
    .fetch_all(&self.pool)
    .await?;
    rows.iter().map(snapshot_from_row).collect()
  }

  async fn delete_snapshot(&self, user_id: &str, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM snapshots WHERE user_id = ?1 AND id = ?2")
      .bind(user_id)
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn get_profile(&self, user_id: &str) -> Result<UserProfile> {
    sqlx::query("INSERT OR IGNORE INTO profiles (user_id) VALUES (?1)")
      .bind(user_id)
      .execute(&self.pool)
      .await?;

    let row = sqlx::query("SELECT * FROM profiles WHERE user_id = ?1")
      .bind(user_id)
      .fetch_one(&self.pool)
      .await?;
    profile_from_row(&row)
  }

  async fn update_profile(&self, user_id: &str, patch: &ProfilePatch) -> Result<UserProfile> {
    patch.validate()?;
    let mut profile = self.get_profile(user_id).await?;
    patch.apply(&mut profile);

    sqlx::query(
      r#"
      UPDATE profiles
      SET steps_goal = ?2, sleep_goal_hours = ?3, sex = ?4, pregnant = ?5, cycle_day = ?6
      WHERE user_id = ?1
      "#,
    )
    .bind(user_id)
    .bind(profile.steps_goal)
    .bind(profile.sleep_goal_hours)
    .bind(&profile.sex)
    .bind(profile.pregnant)
    .bind(profile.cycle_day)
    .execute(&self.pool)
    .await?;

    Ok(profile)
  }

  async fn get_manual(&self, user_id: &str, day: &str) -> Result<Option<ManualDaily>> {
    let row = sqlx::query("SELECT * FROM manual_daily WHERE user_id = ?1 AND day = ?2")
      .bind(user_id)
      .bind(day)
      .fetch_optional(&self.pool)
      .await?;
    row.as_ref().map(manual_from_row).transpose()
  }

  async fn upsert_manual(&self, user_id: &str, input: &ManualInput) -> Result<ManualDaily> {
    input.validate()?;
    let updated_at = Utc::now();

    sqlx::query(
      r#"
      INSERT INTO manual_daily (
        user_id, day, symptom_score, caffeine_cups, alcohol_units, notes, trained, meds, updated_at
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
      ON CONFLICT(user_id, day) DO UPDATE SET
        symptom_score = excluded.symptom_score,
        caffeine_cups = excluded.caffeine_cups,
        alcohol_units = excluded.alcohol_units,
        notes = excluded.notes,
        trained = excluded.trained,
        meds = excluded.meds,
        updated_at = excluded.updated_at
      "#,
    )
    .bind(user_id)
    .bind(&input.day)
    .bind(input.symptom_score)
    .bind(input.caffeine_cups)
    .bind(input.alcohol_units)
    .bind(&input.notes)
    .bind(input.trained)
    .bind(input.meds)
    .bind(updated_at)
    .execute(&self.pool)
    .await?;

    Ok(ManualDaily {
      user_id: user_id.to_string(),
      day: input.day.clone(),
      symptom_score: input.symptom_score,
      caffeine_cups: input.caffeine_cups,
      alcohol_units: input.alcohol_units,
      notes: input.notes.clone(),
      trained: input.trained,
      meds: input.meds,
      updated_at,
    })
  }

  async fn get_brief(&self, user_id: &str, day: &str) -> Result<Option<AiBrief>> {
    let row = sqlx::query("SELECT * FROM ai_briefs WHERE user_id = ?1 AND day = ?2")
      .bind(user_id)
      .bind(day)
      .fetch_optional(&self.pool)
      .await?;
    row.as_ref().map(brief_from_row).transpose()
  }

  async fn upsert_brief(&self, user_id: &str, input: &BriefInput) -> Result<AiBrief> {
    let now = Utc::now();
    let signals = serde_json::to_string(&input.signals)?;
    let suggestions = serde_json::to_string(&input.suggestions)?;

    sqlx::query(
      r#"
      INSERT INTO ai_briefs (id, user_id, day, risk, short, signals, suggestions, model, created_at, updated_at)
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
      ON CONFLICT(user_id, day) DO UPDATE SET
        risk = excluded.risk,
        short = excluded.short,
        signals = excluded.signals,
        suggestions = excluded.suggestions,
        model = excluded.model,
        updated_at = excluded.updated_at
      "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(&input.day)
    .bind(input.risk.as_str())
    .bind(&input.short)
    .bind(&signals)
    .bind(&suggestions)
    .bind(&input.model)
    .bind(now)
    .bind(now)
    .execute(&self.pool)
    .await?;

    self
      .get_brief(user_id, &input.day)
      .await?
      .ok_or_else(|| HealthError::Store("brief upsert did not persist".into()))
  }

  async fn delete_brief(&self, user_id: &str, day: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM ai_briefs WHERE user_id = ?1 AND day = ?2")
      .bind(user_id)
      .bind(day)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn list_briefs_by_range(
    &self,
    user_id: &str,
    from_day: &str,
    to_day: &str,
  ) -> Result<Vec<AiBrief>> {
    let rows = sqlx::query(
      r#"
      SELECT * FROM ai_briefs
      WHERE user_id = ?1 AND day >= ?2 AND day <= ?3
      ORDER BY day ASC
      "#,
    )
    .bind(user_id)
    .bind(from_day)
    .bind(to_day)
    .fetch_all(&self.pool)
    .await?;
    rows.iter().map(brief_from_row).collect()
  }

  async fn upsert_alert(
    &self,
    user_id: &str,
    day: &str,
    severity: Risk,
    title: &str,
    body: &str,
  ) -> Result<Alert> {
    let now = Utc::now();

    sqlx::query(
      r#"
      INSERT INTO alerts (id, user_id, day, severity, title, body, created_at, updated_at)
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
      ON CONFLICT(user_id, day, severity, title) DO UPDATE SET
        body = excluded.body,
        updated_at = excluded.updated_at
      "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(day)
    .bind(severity.as_str())
    .bind(title)
    .bind(body)
    .bind(now)
    .bind(now)
    .execute(&self.pool)
    .await?;

    let row = sqlx::query(
      "SELECT * FROM alerts WHERE user_id = ?1 AND day = ?2 AND severity = ?3 AND title = ?4",
    )
    .bind(user_id)
    .bind(day)
    .bind(severity.as_str())
    .bind(title)
    .fetch_one(&self.pool)
    .await?;
    alert_from_row(&row)
  }

  async fn list_alerts(&self, user_id: &str, limit: usize) -> Result<Vec<Alert>> {
    let rows = sqlx::query(
      "SELECT * FROM alerts WHERE user_id = ?1 ORDER BY day DESC, updated_at DESC LIMIT ?2",
    )
    .bind(user_id)
    .bind(limit as i64)
    .fetch_all(&self.pool)
    .await?;
    rows.iter().map(alert_from_row).collect()
  }
}
