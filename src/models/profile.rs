use serde::{Deserialize, Serialize};

use crate::error::{HealthError, Result};

pub const DEFAULT_STEPS_GOAL: i64 = 8000;
pub const DEFAULT_SLEEP_GOAL_HOURS: f64 = 7.5;

/// Per-user goals plus optional cycle-tracking context. Lazily created with
/// defaults on first read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
  pub user_id: String,
  pub steps_goal: i64,
  pub sleep_goal_hours: f64,
  pub sex: Option<String>,
  pub pregnant: Option<bool>,
  pub cycle_day: Option<i64>,
}

impl UserProfile {
  pub fn with_defaults(user_id: &str) -> Self {
    Self {
      user_id: user_id.to_string(),
      steps_goal: DEFAULT_STEPS_GOAL,
      sleep_goal_hours: DEFAULT_SLEEP_GOAL_HOURS,
      sex: None,
      pregnant: None,
      cycle_day: None,
    }
  }
}

/// Partial update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilePatch {
  pub steps_goal: Option<i64>,
  pub sleep_goal_hours: Option<f64>,
  pub sex: Option<String>,
  pub pregnant: Option<bool>,
  pub cycle_day: Option<i64>,
}

impl ProfilePatch {
  pub fn validate(&self) -> Result<()> {
    if let Some(goal) = self.steps_goal {
      if goal <= 0 {
        return Err(HealthError::InvalidInput("steps_goal must be positive".into()));
      }
    }
    if let Some(goal) = self.sleep_goal_hours {
      if !goal.is_finite() || goal <= 0.0 || goal > 24.0 {
        return Err(HealthError::InvalidInput(format!("sleep_goal_hours out of range: {goal}")));
      }
    }
    if let Some(day) = self.cycle_day {
      if !(1..=40).contains(&day) {
        return Err(HealthError::InvalidInput(format!("cycle_day out of range 1-40: {day}")));
      }
    }
    Ok(())
  }

  pub fn apply(&self, profile: &mut UserProfile) {
    if let Some(goal) = self.steps_goal {
      profile.steps_goal = goal;
    }
    if let Some(goal) = self.sleep_goal_hours {
      // Goals are stored to one decimal.
      profile.sleep_goal_hours = (goal * 10.0).round() / 10.0;
    }
    if let Some(sex) = &self.sex {
      profile.sex = Some(sex.clone());
    }
    if let Some(pregnant) = self.pregnant {
      profile.pregnant = Some(pregnant);
    }
    if let Some(day) = self.cycle_day {
      profile.cycle_day = Some(day);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let p = UserProfile::with_defaults("u1");
    assert_eq!(p.steps_goal, 8000);
    assert_eq!(p.sleep_goal_hours, 7.5);
    assert!(p.sex.is_none());
  }

  #[test]
  fn test_patch_applies_only_present_fields() {
    let mut p = UserProfile::with_defaults("u1");
    let patch = ProfilePatch {
      sleep_goal_hours: Some(8.04),
      ..Default::default()
    };
    patch.apply(&mut p);
    assert_eq!(p.sleep_goal_hours, 8.0);
    assert_eq!(p.steps_goal, 8000); // unchanged
  }

  #[test]
  fn test_patch_validation() {
    let patch = ProfilePatch { cycle_day: Some(41), ..Default::default() };
    assert!(patch.validate().is_err());
    let patch = ProfilePatch { cycle_day: Some(40), ..Default::default() };
    assert!(patch.validate().is_ok());
  }
}
