use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::risk::Risk;

/// One named signal the summarizer called out, with its explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefSignal {
  pub name: String,
  pub value: String,
  pub why: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefSuggestion {
  pub title: String,
  pub detail: String,
}

/// Validated brief content ready to persist. The store assigns id and
/// timestamps; a later upsert for the same (user, day) keeps the original id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BriefInput {
  pub day: String,
  pub risk: Risk,
  pub short: String,
  pub signals: Vec<BriefSignal>,
  pub suggestions: Vec<BriefSuggestion>,
  pub model: String,
}

/// One persisted daily risk brief per user+day. Regeneration overwrites in
/// place; never partially updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiBrief {
  pub id: String,
  pub user_id: String,
  pub day: String,
  pub risk: Risk,
  pub short: String,
  pub signals: Vec<BriefSignal>,
  pub suggestions: Vec<BriefSuggestion>,
  pub model: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
