use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::risk::Risk;

/// User-visible escalation of a MED/HIGH brief or anomaly. Unique on
/// (user, day, severity, title) so repeated runs update the body instead of
/// duplicating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
  pub id: String,
  pub user_id: String,
  pub day: String,
  pub severity: Risk,
  pub title: String,
  pub body: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
