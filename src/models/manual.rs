use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HealthError, Result};

/// Subjective/manual inputs for one user+day. Upserted by day key,
/// last-write-wins per field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualDaily {
  pub user_id: String,
  pub day: String,
  pub symptom_score: Option<i64>,
  pub caffeine_cups: Option<i64>,
  pub alcohol_units: Option<f64>,
  pub notes: Option<String>,
  pub trained: Option<bool>,
  pub meds: Option<bool>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualInput {
  pub day: String,
  pub symptom_score: Option<i64>,
  pub caffeine_cups: Option<i64>,
  pub alcohol_units: Option<f64>,
  pub notes: Option<String>,
  pub trained: Option<bool>,
  pub meds: Option<bool>,
}

impl ManualInput {
  pub fn validate(&self) -> Result<()> {
    if !crate::dates::is_valid_day(&self.day) {
      return Err(HealthError::InvalidInput(format!("bad day string: {}", self.day)));
    }
    if let Some(score) = self.symptom_score {
      if !(0..=3).contains(&score) {
        return Err(HealthError::InvalidInput(format!("symptom_score out of range 0-3: {score}")));
      }
    }
    if let Some(cups) = self.caffeine_cups {
      if cups < 0 {
        return Err(HealthError::InvalidInput("caffeine_cups must be non-negative".into()));
      }
    }
    if let Some(units) = self.alcohol_units {
      if units < 0.0 {
        return Err(HealthError::InvalidInput("alcohol_units must be non-negative".into()));
      }
    }
    Ok(())
  }
}
