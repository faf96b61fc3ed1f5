//! Local-file backend
//!
//! JSON files under `<data>/users/<user>/`: one snapshot array per day,
//! one file per manual/brief day, a single profile file and a single alerts
//! file. Record shapes are identical to the sqlite backend.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::Store;
use crate::error::{HealthError, Result};
use crate::models::{
  AiBrief, Alert, BriefInput, ManualDaily, ManualInput, ProfilePatch, Risk, Snapshot,
  SnapshotInput, UserProfile,
};

pub struct FileStore {
  root: PathBuf,
}

impl FileStore {
  pub fn new(root: PathBuf) -> Self {
    Self { root }
  }

  fn user_dir(&self, user_id: &str) -> PathBuf {
    self.root.join("users").join(user_id)
  }

  fn snapshots_dir(&self, user_id: &str) -> PathBuf {
    self.user_dir(user_id).join("snapshots")
  }

  fn snapshot_path(&self, user_id: &str, day: &str) -> PathBuf {
    self.snapshots_dir(user_id).join(format!("{day}.json"))
  }

  fn profile_path(&self, user_id: &str) -> PathBuf {
    self.user_dir(user_id).join("profile.json")
  }

  fn manual_path(&self, user_id: &str, day: &str) -> PathBuf {
    self.user_dir(user_id).join("manual").join(format!("{day}.json"))
  }

  fn brief_path(&self, user_id: &str, day: &str) -> PathBuf {
    self.user_dir(user_id).join("briefs").join(format!("{day}.json"))
  }

  fn alerts_path(&self, user_id: &str) -> PathBuf {
    self.user_dir(user_id).join("alerts.json")
  }
}

async fn read_json_or<T: DeserializeOwned>(path: &Path, fallback: T) -> Result<T> {
  match tokio::fs::read(path).await {
    Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(fallback),
    Err(e) => Err(e.into()),
  }
}

async fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
  match tokio::fs::read(path).await {
    Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
    Err(e) => Err(e.into()),
  }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
  if let Some(parent) = path.parent() {
    tokio::fs::create_dir_all(parent).await?;
  }
  let bytes = serde_json::to_vec_pretty(value)?;
  tokio::fs::write(path, bytes).await?;
  Ok(())
}

async fn remove_if_exists(path: &Path) -> Result<bool> {
  match tokio::fs::remove_file(path).await {
    Ok(()) => Ok(true),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
    Err(e) => Err(e.into()),
  }
}

impl FileStore {
  /// Day files a user has, ascending. Missing dir means no snapshots yet.
  async fn snapshot_days(&self, user_id: &str) -> Result<Vec<String>> {
    let dir = self.snapshots_dir(user_id);
    let mut days = Vec::new();
    let mut entries = match tokio::fs::read_dir(&dir).await {
      Ok(e) => e,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(days),
      Err(e) => return Err(e.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
      if let Some(name) = entry.file_name().to_str() {
        if let Some(day) = name.strip_suffix(".json") {
          days.push(day.to_string());
        }
      }
    }
    days.sort();
    Ok(days)
  }
}

impl Store for FileStore {
  async fn create_snapshot(&self, user_id: &str, input: SnapshotInput) -> Result<Snapshot> {
    if !crate::dates::is_valid_day(&input.day) {
      return Err(HealthError::InvalidInput(format!("bad day string: {}", input.day)));
    }

    let path = self.snapshot_path(user_id, &input.day);
    let mut existing: Vec<Snapshot> = read_json_or(&path, Vec::new()).await?;

    let created = Snapshot {
      id: Uuid::new_v4().to_string(),
      user_id: user_id.to_string(),
      day: input.day,
      taken_at: input.taken_at,
      created_at: Utc::now(),
      metrics: input.metrics,
      raw_json: input.raw_json,
    };

    existing.push(created.clone());
    existing.sort_by_key(|s| s.taken_at);
    write_json(&path, &existing).await?;

    Ok(created)
  }

  async fn get_snapshot(&self, user_id: &str, id: &str) -> Result<Option<Snapshot>> {
    for day in self.snapshot_days(user_id).await? {
      let snaps: Vec<Snapshot> = read_json_or(&self.snapshot_path(user_id, &day), Vec::new()).await?;
      if let Some(snap) = snaps.into_iter().find(|s| s.id == id) {
        return Ok(Some(snap));
      }
    }
    Ok(None)
  }

  async fn list_snapshots_by_day(&self, user_id: &str, day: &str) -> Result<Vec<Snapshot>> {
    let mut snaps: Vec<Snapshot> =
      read_json_or(&self.snapshot_path(user_id, day), Vec::new()).await?;
    snaps.sort_by_key(|s| s.taken_at);
    Ok(snaps)
  }

  async fn list_snapshots_by_range(
    &self,
    user_id: &str,
    from_day: &str,
    to_day: &str,
  ) -> Result<Vec<Snapshot>> {
    let mut out = Vec::new();
    for day in self.snapshot_days(user_id).await? {
      if day.as_str() < from_day || day.as_str() > to_day {
        continue;
      }
      out.extend(self.list_snapshots_by_day(user_id, &day).await?);
    }
    Ok(out)
  }

  async fn delete_snapshot(&self, user_id: &str, id: &str) -> Result<bool> {
    for day in self.snapshot_days(user_id).await? {
      let path = self.snapshot_path(user_id, &day);
      let snaps: Vec<Snapshot> = read_json_or(&path, Vec::new()).await?;
      let before = snaps.len();
      let remaining: Vec<Snapshot> = snaps.into_iter().filter(|s| s.id != id).collect();
      if remaining.len() != before {
        if remaining.is_empty() {
          remove_if_exists(&path).await?;
        } else {
          write_json(&path, &remaining).await?;
        }
        return Ok(true);
      }
    }
    Ok(false)
  }

  async fn get_profile(&self, user_id: &str) -> Result<UserProfile> {
    let path = self.profile_path(user_id);
    match read_json_opt::<UserProfile>(&path).await? {
      Some(profile) => Ok(profile),
      None => {
        let profile = UserProfile::with_defaults(user_id);
        write_json(&path, &profile).await?;
        Ok(profile)
      }
    }
  }

  async fn update_profile(&self, user_id: &str, patch: &ProfilePatch) -> Result<UserProfile> {
    patch.validate()?;
    let mut profile = self.get_profile(user_id).await?;
    patch.apply(&mut profile);
    write_json(&self.profile_path(user_id), &profile).await?;
    Ok(profile)
  }

  async fn get_manual(&self, user_id: &str, day: &str) -> Result<Option<ManualDaily>> {
    read_json_opt(&self.manual_path(user_id, day)).await
  }

  async fn upsert_manual(&self, user_id: &str, input: &ManualInput) -> Result<ManualDaily> {
    input.validate()?;
    let record = ManualDaily {
      user_id: user_id.to_string(),
      day: input.day.clone(),
      symptom_score: input.symptom_score,
      caffeine_cups: input.caffeine_cups,
      alcohol_units: input.alcohol_units,
      notes: input.notes.clone(),
      trained: input.trained,
      meds: input.meds,
      updated_at: Utc::now(),
    };
    write_json(&self.manual_path(user_id, &input.day), &record).await?;
    Ok(record)
  }

  async fn get_brief(&self, user_id: &str, day: &str) -> Result<Option<AiBrief>> {
    read_json_opt(&self.brief_path(user_id, day)).await
  }

  async fn upsert_brief(&self, user_id: &str, input: &BriefInput) -> Result<AiBrief> {
    let path = self.brief_path(user_id, &input.day);
    let existing: Option<AiBrief> = read_json_opt(&path).await?;
    let now = Utc::now();

    let brief = AiBrief {
      id: existing.as_ref().map(|b| b.id.clone()).unwrap_or_else(|| Uuid::new_v4().to_string()),
      user_id: user_id.to_string(),
      day: input.day.clone(),
      risk: input.risk,
      short: input.short.clone(),
      signals: input.signals.clone(),
      suggestions: input.suggestions.clone(),
      model: input.model.clone(),
      created_at: existing.as_ref().map(|b| b.created_at).unwrap_or(now),
      updated_at: now,
    };

    write_json(&path, &brief).await?;
    Ok(brief)
  }

  async fn delete_brief(&self, user_id: &str, day: &str) -> Result<bool> {
    remove_if_exists(&self.brief_path(user_id, day)).await
  }

  async fn list_briefs_by_range(
    &self,
    user_id: &str,
    from_day: &str,
    to_day: &str,
  ) -> Result<Vec<AiBrief>> {
    let days = crate::dates::days_between(from_day, to_day)?;
    let mut out = Vec::new();
    for day in days {
      if let Some(brief) = self.get_brief(user_id, &day).await? {
        out.push(brief);
      }
    }
    Ok(out)
  }

  async fn upsert_alert(
    &self,
    user_id: &str,
    day: &str,
    severity: Risk,
    title: &str,
    body: &str,
  ) -> Result<Alert> {
    let path = self.alerts_path(user_id);
    let mut alerts: Vec<Alert> = read_json_or(&path, Vec::new()).await?;
    let now = Utc::now();

    let updated = match alerts
      .iter_mut()
      .find(|a| a.day == day && a.severity == severity && a.title == title)
    {
      Some(existing) => {
        existing.body = body.to_string();
        existing.updated_at = now;
        existing.clone()
      }
      None => {
        let alert = Alert {
          id: Uuid::new_v4().to_string(),
          user_id: user_id.to_string(),
          day: day.to_string(),
          severity,
          title: title.to_string(),
          body: body.to_string(),
          created_at: now,
          updated_at: now,
        };
        alerts.push(alert.clone());
        alert
      }
    };

    write_json(&path, &alerts).await?;
    Ok(updated)
  }

  async fn list_alerts(&self, user_id: &str, limit: usize) -> Result<Vec<Alert>> {
    let mut alerts: Vec<Alert> = read_json_or(&self.alerts_path(user_id), Vec::new()).await?;
    alerts.sort_by(|a, b| b.day.cmp(&a.day).then(b.updated_at.cmp(&a.updated_at)));
    alerts.truncate(limit);
    Ok(alerts)
  }
}
