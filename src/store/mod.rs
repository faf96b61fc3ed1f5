//! Snapshot store accessor
//!
//! Two interchangeable backends behind one capability interface: a sqlite
//! store and a local-file fallback. Both produce identical record shapes, so
//! callers never branch on backend. Selection happens once via a connectivity
//! probe; `AnyStore::shared` memoizes the choice for the process lifetime (the
//! only process-wide state in the crate). A backend outage discovered after
//! caching surfaces as a `Store` error, it is not re-probed mid-process.

mod db;
mod file;

pub use db::SqliteStore;
pub use file::FileStore;

use tokio::sync::OnceCell;

use crate::config::Config;
use crate::error::Result;
use crate::models::{
  AiBrief, Alert, BriefInput, ManualDaily, ManualInput, ProfilePatch, Risk, Snapshot,
  SnapshotInput, UserProfile,
};

/// ---------------------------------------------------------------------------
/// Capability interface
/// ---------------------------------------------------------------------------

#[allow(async_fn_in_trait)]
pub trait Store {
  /// Append one capture. The store assigns id and creation time.
  async fn create_snapshot(&self, user_id: &str, input: SnapshotInput) -> Result<Snapshot>;
  async fn get_snapshot(&self, user_id: &str, id: &str) -> Result<Option<Snapshot>>;
  /// Ascending by capture time.
  async fn list_snapshots_by_day(&self, user_id: &str, day: &str) -> Result<Vec<Snapshot>>;
  /// Ascending by (day, capture time), inclusive bounds.
  async fn list_snapshots_by_range(
    &self,
    user_id: &str,
    from_day: &str,
    to_day: &str,
  ) -> Result<Vec<Snapshot>>;
  /// Returns whether a row was actually removed.
  async fn delete_snapshot(&self, user_id: &str, id: &str) -> Result<bool>;

  /// Lazily creates a default profile on first read.
  async fn get_profile(&self, user_id: &str) -> Result<UserProfile>;
  async fn update_profile(&self, user_id: &str, patch: &ProfilePatch) -> Result<UserProfile>;

  async fn get_manual(&self, user_id: &str, day: &str) -> Result<Option<ManualDaily>>;
  async fn upsert_manual(&self, user_id: &str, input: &ManualInput) -> Result<ManualDaily>;

  async fn get_brief(&self, user_id: &str, day: &str) -> Result<Option<AiBrief>>;
  /// Insert or replace by (user, day); a replace keeps the original id and
  /// creation time.
  async fn upsert_brief(&self, user_id: &str, input: &BriefInput) -> Result<AiBrief>;
  async fn delete_brief(&self, user_id: &str, day: &str) -> Result<bool>;
  async fn list_briefs_by_range(
    &self,
    user_id: &str,
    from_day: &str,
    to_day: &str,
  ) -> Result<Vec<AiBrief>>;

  /// Insert or replace by (user, day, severity, title); a replace updates the
  /// body only.
  async fn upsert_alert(
    &self,
    user_id: &str,
    day: &str,
    severity: Risk,
    title: &str,
    body: &str,
  ) -> Result<Alert>;
  /// Most recent first.
  async fn list_alerts(&self, user_id: &str, limit: usize) -> Result<Vec<Alert>>;
}

/// ---------------------------------------------------------------------------
/// Backend selection
/// ---------------------------------------------------------------------------

pub enum AnyStore {
  Sqlite(SqliteStore),
  File(FileStore),
}

static SHARED: OnceCell<AnyStore> = OnceCell::const_new();

impl AnyStore {
  /// Probe the database and pick a backend. Prefers sqlite when reachable,
  /// falls back to the file store otherwise. Never fails.
  pub async fn select(config: &Config) -> AnyStore {
    if !config.use_file_store {
      if let Some(url) = &config.database_url {
        match SqliteStore::connect(url).await {
          Ok(store) => match store.ping().await {
            Ok(()) => {
              log::info!("store backend=sqlite url={url}");
              return AnyStore::Sqlite(store);
            }
            Err(e) => log::warn!("sqlite probe failed, falling back to file store: {e}"),
          },
          Err(e) => log::warn!("sqlite connect failed, falling back to file store: {e}"),
        }
      }
    }
    log::info!("store backend=file dir={}", config.data_dir.display());
    AnyStore::File(FileStore::new(config.data_dir.clone()))
  }

  /// The process-wide store. Probes at most once; a duplicate probe during a
  /// racy first use is harmless.
  pub async fn shared(config: &Config) -> &'static AnyStore {
    SHARED.get_or_init(|| Self::select(config)).await
  }
}

macro_rules! delegate {
  ($self:ident, $store:ident => $body:expr) => {
    match $self {
      AnyStore::Sqlite($store) => $body,
      AnyStore::File($store) => $body,
    }
  };
}

impl Store for AnyStore {
  async fn create_snapshot(&self, user_id: &str, input: SnapshotInput) -> Result<Snapshot> {
    delegate!(self, s => s.create_snapshot(user_id, input).await)
  }

  async fn get_snapshot(&self, user_id: &str, id: &str) -> Result<Option<Snapshot>> {
    delegate!(self, s => s.get_snapshot(user_id, id).await)
  }

  async fn list_snapshots_by_day(&self, user_id: &str, day: &str) -> Result<Vec<Snapshot>> {
    delegate!(self, s => s.list_snapshots_by_day(user_id, day).await)
  }

  async fn list_snapshots_by_range(
    &self,
    user_id: &str,
    from_day: &str,
    to_day: &str,
  ) -> Result<Vec<Snapshot>> {
    delegate!(self, s => s.list_snapshots_by_range(user_id, from_day, to_day).await)
  }

  async fn delete_snapshot(&self, user_id: &str, id: &str) -> Result<bool> {
    delegate!(self, s => s.delete_snapshot(user_id, id).await)
  }

  async fn get_profile(&self, user_id: &str) -> Result<UserProfile> {
    delegate!(self, s => s.get_profile(user_id).await)
  }

  async fn update_profile(&self, user_id: &str, patch: &ProfilePatch) -> Result<UserProfile> {
    delegate!(self, s => s.update_profile(user_id, patch).await)
  }

  async fn get_manual(&self, user_id: &str, day: &str) -> Result<Option<ManualDaily>> {
    delegate!(self, s => s.get_manual(user_id, day).await)
  }

  async fn upsert_manual(&self, user_id: &str, input: &ManualInput) -> Result<ManualDaily> {
    delegate!(self, s => s.upsert_manual(user_id, input).await)
  }

  async fn get_brief(&self, user_id: &str, day: &str) -> Result<Option<AiBrief>> {
    delegate!(self, s => s.get_brief(user_id, day).await)
  }

  async fn upsert_brief(&self, user_id: &str, input: &BriefInput) -> Result<AiBrief> {
    delegate!(self, s => s.upsert_brief(user_id, input).await)
  }

  async fn delete_brief(&self, user_id: &str, day: &str) -> Result<bool> {
    delegate!(self, s => s.delete_brief(user_id, day).await)
  }

  async fn list_briefs_by_range(
    &self,
    user_id: &str,
    from_day: &str,
    to_day: &str,
  ) -> Result<Vec<AiBrief>> {
    delegate!(self, s => s.list_briefs_by_range(user_id, from_day, to_day).await)
  }

  async fn upsert_alert(
    &self,
    user_id: &str,
    day: &str,
    severity: Risk,
    title: &str,
    body: &str,
  ) -> Result<Alert> {
    delegate!(self, s => s.upsert_alert(user_id, day, severity, title, body).await)
  }

  async fn list_alerts(&self, user_id: &str, limit: usize) -> Result<Vec<Alert>> {
    delegate!(self, s => s.list_alerts(user_id, limit).await)
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::{instant_on, seed_snapshot, setup_test_store, vitals};

  fn temp_file_store() -> FileStore {
    let root = std::env::temp_dir().join(format!("store-test-{}", uuid::Uuid::new_v4()));
    FileStore::new(root)
  }

  /// The snapshot contract both backends must satisfy identically.
  async fn exercise_snapshot_contract(store: &impl Store) {
    let a = store
      .create_snapshot(
        "u1",
        SnapshotInput {
          day: "2024-05-01".into(),
          taken_at: instant_on("2024-05-01", 6),
          metrics: vitals(58.0, 20.0, 50.0, 7.5, 8000.0),
          raw_json: None,
        },
      )
      .await
      .unwrap();
    let b = store
      .create_snapshot(
        "u1",
        SnapshotInput {
          day: "2024-05-01".into(),
          taken_at: instant_on("2024-05-01", 12),
          metrics: vitals(60.0, 25.0, 45.0, 7.0, 9000.0),
          raw_json: Some(serde_json::json!({ "steps": 9000 })),
        },
      )
      .await
      .unwrap();
    store
      .create_snapshot(
        "u1",
        SnapshotInput {
          day: "2024-05-03".into(),
          taken_at: instant_on("2024-05-03", 10),
          metrics: vitals(59.0, 22.0, 48.0, 8.0, 7000.0),
          raw_json: None,
        },
      )
      .await
      .unwrap();

    // Day listing ascends by capture time.
    let day = store.list_snapshots_by_day("u1", "2024-05-01").await.unwrap();
    assert_eq!(day.len(), 2);
    assert_eq!(day[0].id, a.id);
    assert_eq!(day[1].id, b.id);
    assert_eq!(day[1].raw_json.as_ref().unwrap()["steps"], 9000);

    // Range is inclusive and ordered by (day, taken_at).
    let range = store.list_snapshots_by_range("u1", "2024-05-01", "2024-05-03").await.unwrap();
    assert_eq!(range.len(), 3);
    assert_eq!(range[2].day, "2024-05-03");

    // Point lookup, cross-user isolation, delete semantics.
    assert!(store.get_snapshot("u1", &a.id).await.unwrap().is_some());
    assert!(store.get_snapshot("other", &a.id).await.unwrap().is_none());
    assert!(store.delete_snapshot("u1", &a.id).await.unwrap());
    assert!(!store.delete_snapshot("u1", &a.id).await.unwrap());
    assert_eq!(store.list_snapshots_by_day("u1", "2024-05-01").await.unwrap().len(), 1);

    // Bad day strings are rejected up front.
    let err = store
      .create_snapshot(
        "u1",
        SnapshotInput {
          day: "01-05-2024".into(),
          taken_at: instant_on("2024-05-01", 6),
          metrics: vitals(58.0, 20.0, 50.0, 7.5, 8000.0),
          raw_json: None,
        },
      )
      .await
      .unwrap_err();
    assert!(matches!(err, crate::error::HealthError::InvalidInput(_)));
  }

  #[tokio::test]
  async fn test_snapshot_contract_sqlite() {
    let store = setup_test_store().await;
    exercise_snapshot_contract(&store).await;
  }

  #[tokio::test]
  async fn test_snapshot_contract_file() {
    let store = temp_file_store();
    exercise_snapshot_contract(&store).await;
  }

  async fn exercise_profile_contract(store: &impl Store) {
    let p = store.get_profile("u1").await.unwrap();
    assert_eq!(p.steps_goal, 8000);
    assert_eq!(p.sleep_goal_hours, 7.5);

    let patched = store
      .update_profile("u1", &ProfilePatch { steps_goal: Some(10000), ..Default::default() })
      .await
      .unwrap();
    assert_eq!(patched.steps_goal, 10000);
    assert_eq!(patched.sleep_goal_hours, 7.5);

    // Persisted, not just returned.
    let again = store.get_profile("u1").await.unwrap();
    assert_eq!(again.steps_goal, 10000);

    let err = store
      .update_profile("u1", &ProfilePatch { cycle_day: Some(41), ..Default::default() })
      .await
      .unwrap_err();
    assert!(matches!(err, crate::error::HealthError::InvalidInput(_)));
  }

  #[tokio::test]
  async fn test_profile_contract_sqlite() {
    let store = setup_test_store().await;
    exercise_profile_contract(&store).await;
  }

  #[tokio::test]
  async fn test_profile_contract_file() {
    let store = temp_file_store();
    exercise_profile_contract(&store).await;
  }

  async fn exercise_manual_contract(store: &impl Store) {
    assert!(store.get_manual("u1", "2024-05-01").await.unwrap().is_none());

    let input = ManualInput {
      day: "2024-05-01".into(),
      caffeine_cups: Some(3),
      ..Default::default()
    };
    store.upsert_manual("u1", &input).await.unwrap();

    let replaced = ManualInput {
      day: "2024-05-01".into(),
      caffeine_cups: Some(5),
      symptom_score: Some(2),
      ..Default::default()
    };
    store.upsert_manual("u1", &replaced).await.unwrap();

    let stored = store.get_manual("u1", "2024-05-01").await.unwrap().unwrap();
    assert_eq!(stored.caffeine_cups, Some(5));
    assert_eq!(stored.symptom_score, Some(2));

    // Other days are untouched by the upsert.
    assert!(store.get_manual("u1", "2024-05-02").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_manual_contract_sqlite() {
    let store = setup_test_store().await;
    exercise_manual_contract(&store).await;
  }

  #[tokio::test]
  async fn test_manual_contract_file() {
    let store = temp_file_store();
    exercise_manual_contract(&store).await;
  }

  async fn exercise_brief_upsert(store: &impl Store) {
    seed_snapshot(store, "u1", "2024-05-01", vitals(58.0, 20.0, 50.0, 7.5, 8000.0)).await;

    let input = BriefInput {
      day: "2024-05-01".into(),
      risk: Risk::Low,
      short: "første".into(),
      signals: vec![],
      suggestions: vec![],
      model: "stub".into(),
    };
    let first = store.upsert_brief("u1", &input).await.unwrap();

    let replaced = BriefInput { risk: Risk::Med, short: "anden".into(), ..input };
    let second = store.upsert_brief("u1", &replaced).await.unwrap();

    // Replace keeps identity and creation time, swaps content.
    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(second.risk, Risk::Med);
    assert_eq!(second.short, "anden");

    assert!(store.delete_brief("u1", "2024-05-01").await.unwrap());
    assert!(!store.delete_brief("u1", "2024-05-01").await.unwrap());
  }

  #[tokio::test]
  async fn test_brief_upsert_sqlite() {
    let store = setup_test_store().await;
    exercise_brief_upsert(&store).await;
  }

  #[tokio::test]
  async fn test_brief_upsert_file() {
    let store = temp_file_store();
    exercise_brief_upsert(&store).await;
  }

  async fn exercise_alert_contract(store: &impl Store) {
    let first = store
      .upsert_alert("u1", "2024-05-01", Risk::Med, "AI brief: risiko", "krop 1")
      .await
      .unwrap();
    let second = store
      .upsert_alert("u1", "2024-05-01", Risk::Med, "AI brief: risiko", "krop 2")
      .await
      .unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.body, "krop 2");

    // A different severity on the same day is a distinct alert.
    store
      .upsert_alert("u1", "2024-05-01", Risk::High, "AI brief: risiko", "krop 3")
      .await
      .unwrap();

    let alerts = store.list_alerts("u1", 10).await.unwrap();
    assert_eq!(alerts.len(), 2);

    let limited = store.list_alerts("u1", 1).await.unwrap();
    assert_eq!(limited.len(), 1);
  }

  #[tokio::test]
  async fn test_alert_contract_sqlite() {
    let store = setup_test_store().await;
    exercise_alert_contract(&store).await;
  }

  #[tokio::test]
  async fn test_alert_contract_file() {
    let store = temp_file_store();
    exercise_alert_contract(&store).await;
  }

  async fn exercise_alert_ordering(store: &impl Store) {
    store.upsert_alert("u1", "2024-05-01", Risk::Med, "a", "x").await.unwrap();
    store.upsert_alert("u1", "2024-05-03", Risk::Med, "b", "y").await.unwrap();
    store.upsert_alert("u1", "2024-05-02", Risk::Med, "c", "z").await.unwrap();

    let alerts = store.list_alerts("u1", 10).await.unwrap();
    let days: Vec<&str> = alerts.iter().map(|a| a.day.as_str()).collect();
    assert_eq!(days, vec!["2024-05-03", "2024-05-02", "2024-05-01"]);
  }

  #[tokio::test]
  async fn test_list_alerts_newest_day_first_sqlite() {
    let store = setup_test_store().await;
    exercise_alert_ordering(&store).await;
  }

  #[tokio::test]
  async fn test_list_alerts_newest_day_first_file() {
    let store = temp_file_store();
    exercise_alert_ordering(&store).await;
  }

  #[tokio::test]
  async fn test_shared_memoizes_backend_selection() {
    let config = Config {
      database_url: None,
      use_file_store: true,
      data_dir: std::env::temp_dir().join(format!("store-test-{}", uuid::Uuid::new_v4())),
      garmin_data_dir: std::path::PathBuf::from(".data/garmin"),
      openai_api_key: None,
      openai_model: "gpt-4o-mini".to_string(),
    };
    let first = AnyStore::shared(&config).await;

    // A different config on the second call changes nothing: the probe ran
    // once and the choice is pinned for the process.
    let other = Config { data_dir: std::path::PathBuf::from(".other"), ..config };
    let second = AnyStore::shared(&other).await;

    assert!(std::ptr::eq(first, second));
    assert!(matches!(first, AnyStore::File(_)));
  }
}
