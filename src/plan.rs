//! Deterministic day-plan policy
//!
//! A fixed rule cascade that turns today's derived signals into an intensity
//! recommendation plus template suggestions, with no AI involved. Later rules
//! override earlier ones in a fixed order, and tomorrow's plan is damped from
//! today's rather than computed from tomorrow's nonexistent data.

use serde::{Deserialize, Serialize};

use crate::dates::add_days_ymd;
use crate::error::Result;
use crate::insights::{compute_sleep_debt, detect_early_warning, EarlyWarning, SLEEP_DEBT_WINDOW_DAYS};
use crate::models::Risk;
use crate::store::Store;

/// Cascade thresholds. Heuristic constants, not derived.
const DEBT_FORCES_LIGHT_HOURS: f64 = 3.0;
const DEBT_ALLOWS_MODERATE_HOURS: f64 = 1.5;
const DEBT_ALLOWS_HARD_HOURS: f64 = 0.5;
const HARD_MAX_STRESS: f64 = 25.0;
const HARD_MIN_BB_LOW: f64 = 35.0;
const BEDTIME_HINT_DEBT_HOURS: f64 = 2.0;
const CHECKIN_RHR: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanIntensity {
  #[serde(rename = "let")]
  Light,
  #[serde(rename = "moderat")]
  Moderate,
  #[serde(rename = "hård")]
  Hard,
}

impl PlanIntensity {
  pub fn as_str(&self) -> &'static str {
    match self {
      PlanIntensity::Light => "let",
      PlanIntensity::Moderate => "moderat",
      PlanIntensity::Hard => "hård",
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeterministicPlan {
  pub day: String,
  pub intensity: PlanIntensity,
  pub reason: String,
  pub suggestions: Vec<String>,
  pub avoid: Vec<String>,
  pub bedtime_hint: String,
}

/// ---------------------------------------------------------------------------
/// Today
/// ---------------------------------------------------------------------------

/// Rule cascade, in order: default moderat; early warning -> let; 7-day sleep
/// debt >= 3h -> let (co-applies with the warning, both reasons listed); calm
/// day with no warning, low debt and yesterday's brief below MED reaffirms
/// moderat; very low debt + low stress + good body battery upgrades to hård.
pub async fn compute_deterministic_plan(
  store: &impl Store,
  user_id: &str,
  day: &str,
) -> Result<DeterministicPlan> {
  let today = store.list_snapshots_by_day(user_id, day).await?;
  let latest = today.last();

  let stress = latest.and_then(|s| s.metrics.stress_avg).unwrap_or(0.0);
  let bb_low = latest.and_then(|s| s.metrics.body_battery_low).unwrap_or(100.0);
  let resting_hr = latest.and_then(|s| s.metrics.resting_hr).unwrap_or(0.0);

  let sleep_debt = compute_sleep_debt(store, user_id, day, SLEEP_DEBT_WINDOW_DAYS).await?;
  let debt = sleep_debt.debt_hours;

  // An anomaly-check failure must never block the plan.
  let warning = detect_early_warning(store, user_id, day)
    .await
    .unwrap_or(EarlyWarning::Clear { reason: "error" });
  let warned = warning.fired().is_some();

  let prev_day = add_days_ymd(day, -1)?;
  let yesterday_risk = store.get_brief(user_id, &prev_day).await?.map(|b| b.risk);

  let mut intensity = PlanIntensity::Moderate;
  let mut reasons: Vec<String> = Vec::new();

  if warned {
    intensity = PlanIntensity::Light;
    reasons.push("din baseline-advarsel (RHR/stress/body battery) peger på belastning".to_string());
  }

  if debt >= DEBT_FORCES_LIGHT_HOURS {
    intensity = PlanIntensity::Light;
    reasons.push(format!("du har ~{debt}t søvngæld (7 dage)"));
  }

  if !warned
    && debt < DEBT_ALLOWS_MODERATE_HOURS
    && yesterday_risk != Some(Risk::High)
    && yesterday_risk != Some(Risk::Med)
  {
    intensity = PlanIntensity::Moderate;
  }

  if !warned && debt < DEBT_ALLOWS_HARD_HOURS && stress < HARD_MAX_STRESS && bb_low > HARD_MIN_BB_LOW {
    intensity = PlanIntensity::Hard;
    reasons.push("lav stress og ok recovery".to_string());
  }

  let reason = if reasons.is_empty() {
    "en balanceret dag baseret på dine seneste data".to_string()
  } else {
    reasons.join(", ")
  };

  let bedtime_hint = if debt >= BEDTIME_HINT_DEBT_HOURS {
    "Gå tidligere i seng i aften (sig efter 30-60 min ekstra).".to_string()
  } else {
    "Hold en stabil sengetid i aften.".to_string()
  };

  let mut suggestions: Vec<String> = Vec::new();
  let mut avoid: Vec<String> = Vec::new();

  match intensity {
    PlanIntensity::Light => {
      suggestions.push("20-40 min rolig gåtur (zone 1-2)".to_string());
      suggestions.push("Tidlig aften + lav stimulation efter kl. 20".to_string());
      suggestions.push("Vand + protein, og hold koffein tidligere på dagen".to_string());
      avoid.push("Hård træning / intervaller".to_string());
      avoid.push("Sen koffein (efter kl. 14)".to_string());
    }
    PlanIntensity::Moderate => {
      suggestions.push("30-60 min moderat aktivitet (gåtur/cykel/let styrke)".to_string());
      suggestions.push("2× 5 min ‘pause-anker’ i løbet af dagen".to_string());
      avoid.push("At ‘spare søvn’ for at få mere tid om aftenen".to_string());
    }
    PlanIntensity::Hard => {
      suggestions.push("Hvis du vil: hård træning OK (men stop hvis stress stikker af)".to_string());
      suggestions.push("Planlæg restitution: mad + søvn = performance".to_string());
      avoid.push("At presse igennem hvis kroppen føles off".to_string());
    }
  }

  if resting_hr >= CHECKIN_RHR {
    suggestions.push("Kort check-in: hvis du føler dig ‘off’, så vælg let dag.".to_string());
  }

  Ok(DeterministicPlan {
    day: day.to_string(),
    intensity,
    reason,
    suggestions,
    avoid,
    bedtime_hint,
  })
}

/// ---------------------------------------------------------------------------
/// Tomorrow
/// ---------------------------------------------------------------------------

/// Hysteresis against back-to-back hard days: hård today damps to moderat
/// tomorrow, and a light day only stays light when today's reason indicates
/// detected strain.
pub async fn compute_tomorrow_deterministic_plan(
  store: &impl Store,
  user_id: &str,
  today: &str,
) -> Result<DeterministicPlan> {
  let today_plan = compute_deterministic_plan(store, user_id, today).await?;
  let tomorrow = add_days_ymd(today, 1)?;

  let mut intensity = today_plan.intensity;
  let mut reasons: Vec<String> = Vec::new();

  if today_plan.intensity == PlanIntensity::Hard {
    intensity = PlanIntensity::Moderate;
    reasons.push("hård dag i dag → planlæg en mere balanceret dag i morgen".to_string());
  }

  if today_plan.intensity == PlanIntensity::Light {
    intensity = PlanIntensity::Moderate;
    reasons.push("let dag i dag → du kan sigte efter en moderat dag i morgen".to_string());
  }

  if today_plan.intensity == PlanIntensity::Light && today_plan.reason.contains("belastning") {
    intensity = PlanIntensity::Light;
    reasons.push("tegn på belastning i dag → hold i morgen let".to_string());
  }

  let reason = if reasons.is_empty() {
    "i morgen bygger videre på i dag (uden at overgøre det)".to_string()
  } else {
    reasons.join(", ")
  };

  let mut suggestions: Vec<String> = Vec::new();
  let mut avoid: Vec<String> = Vec::new();

  match intensity {
    PlanIntensity::Light => {
      suggestions.push("20-40 min rolig gåtur (zone 1-2)".to_string());
      suggestions.push("Lav stimulation efter aftensmad + tidlig sengetid".to_string());
      suggestions.push("Vælg 1 vigtig ting + 1 lille ting — og stop der".to_string());
      avoid.push("At ‘kompensere’ med hård træning".to_string());
      avoid.push("Sen koffein (efter kl. 14)".to_string());
    }
    PlanIntensity::Moderate => {
      suggestions.push("30-60 min moderat aktivitet (gåtur/let styrke/cykel)".to_string());
      suggestions.push("Planlæg et 30 min vindue, så det faktisk sker".to_string());
      suggestions.push("Tænk restitution: vand + protein + ro om aftenen".to_string());
      avoid.push("At lave planen for ambitiøs (så den ryger)".to_string());
    }
    PlanIntensity::Hard => {
      suggestions.push("Hård træning kan være OK — men planlæg søvn og mad omkring det".to_string());
      suggestions.push("Hold øje med stress: stop hvis det stikker af".to_string());
      avoid.push("At presse igennem hvis kroppen føles off".to_string());
    }
  }

  let bedtime_hint = if intensity == PlanIntensity::Light {
    "Prioritér søvn: sigt efter en tidlig sengetid.".to_string()
  } else {
    "Hold en stabil sengetid.".to_string()
  };

  Ok(DeterministicPlan {
    day: tomorrow,
    intensity,
    reason,
    suggestions,
    avoid,
    bedtime_hint,
  })
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::{seed_snapshot, setup_test_store, vitals};

  /// Fourteen calm days ending 2024-05-14 with the given sleep hours.
  async fn seed_history(store: &impl Store, sleep_hours: f64) {
    for i in 1..=14 {
      let day = format!("2024-05-{i:02}");
      seed_snapshot(store, "u1", &day, vitals(58.0, 20.0, 50.0, sleep_hours, 8000.0)).await;
    }
  }

  #[tokio::test]
  async fn test_calm_rested_day_upgrades_to_hard() {
    let store = setup_test_store().await;
    seed_history(&store, 7.5).await;
    seed_snapshot(&store, "u1", "2024-05-15", vitals(58.0, 20.0, 50.0, 7.5, 8000.0)).await;

    let plan = compute_deterministic_plan(&store, "u1", "2024-05-15").await.unwrap();
    assert_eq!(plan.intensity, PlanIntensity::Hard);
    assert!(plan.reason.contains("lav stress"));
  }

  #[tokio::test]
  async fn test_warning_and_debt_override_everything() {
    let store = setup_test_store().await;
    seed_history(&store, 6.0).await; // 7-day debt = 10.5h

    // Anomalous vitals that would otherwise never qualify for hard anyway,
    // but bb_low high enough that only the override rules decide.
    seed_snapshot(&store, "u1", "2024-05-15", vitals(70.0, 40.0, 30.0, 6.0, 8000.0)).await;

    let plan = compute_deterministic_plan(&store, "u1", "2024-05-15").await.unwrap();
    assert_eq!(plan.intensity, PlanIntensity::Light);
    assert!(plan.reason.contains("belastning"));
    assert!(plan.reason.contains("søvngæld"));
  }

  #[tokio::test]
  async fn test_debt_alone_forces_light() {
    let store = setup_test_store().await;
    seed_history(&store, 6.0).await;
    // Calm vitals today: no anomaly, but the debt rule still downgrades.
    seed_snapshot(&store, "u1", "2024-05-15", vitals(58.0, 20.0, 50.0, 6.0, 8000.0)).await;

    let plan = compute_deterministic_plan(&store, "u1", "2024-05-15").await.unwrap();
    assert_eq!(plan.intensity, PlanIntensity::Light);
    assert!(plan.reason.contains("søvngæld"));
    assert!(!plan.reason.contains("baseline-advarsel"));
  }

  #[tokio::test]
  async fn test_bedtime_hint_strengthens_at_two_hours_debt() {
    let store = setup_test_store().await;
    seed_history(&store, 7.2).await; // 7-day debt = 2.1h

    let plan = compute_deterministic_plan(&store, "u1", "2024-05-14").await.unwrap();
    assert!(plan.bedtime_hint.contains("tidligere i seng"));
  }

  #[tokio::test]
  async fn test_empty_store_debt_forces_light() {
    let store = setup_test_store().await;
    // No snapshots at all: an empty window is all shortfall (52.5h against
    // the default goal), so the debt rule downgrades.
    let plan = compute_deterministic_plan(&store, "u1", "2024-05-15").await.unwrap();
    assert_eq!(plan.intensity, PlanIntensity::Light);
    assert!(plan.reason.contains("søvngæld"));
  }

  #[tokio::test]
  async fn test_tomorrow_never_hard_after_hard_day() {
    let store = setup_test_store().await;
    seed_history(&store, 7.5).await;
    seed_snapshot(&store, "u1", "2024-05-15", vitals(58.0, 20.0, 50.0, 7.5, 8000.0)).await;

    let today = compute_deterministic_plan(&store, "u1", "2024-05-15").await.unwrap();
    assert_eq!(today.intensity, PlanIntensity::Hard);

    let tomorrow = compute_tomorrow_deterministic_plan(&store, "u1", "2024-05-15").await.unwrap();
    assert_eq!(tomorrow.day, "2024-05-16");
    assert_eq!(tomorrow.intensity, PlanIntensity::Moderate);
  }

  #[tokio::test]
  async fn test_tomorrow_stays_light_after_detected_strain() {
    let store = setup_test_store().await;
    seed_history(&store, 7.5).await;
    // Today fires the baseline warning.
    seed_snapshot(&store, "u1", "2024-05-15", vitals(70.0, 40.0, 30.0, 7.5, 8000.0)).await;

    let today = compute_deterministic_plan(&store, "u1", "2024-05-15").await.unwrap();
    assert_eq!(today.intensity, PlanIntensity::Light);
    assert!(today.reason.contains("belastning"));

    let tomorrow = compute_tomorrow_deterministic_plan(&store, "u1", "2024-05-15").await.unwrap();
    assert_eq!(tomorrow.intensity, PlanIntensity::Light);
  }

  #[tokio::test]
  async fn test_tomorrow_after_light_debt_day_is_moderate() {
    let store = setup_test_store().await;
    seed_history(&store, 6.0).await;
    seed_snapshot(&store, "u1", "2024-05-15", vitals(58.0, 20.0, 50.0, 6.0, 8000.0)).await;

    // Light purely from sleep debt, no strain wording: tomorrow relaxes.
    let tomorrow = compute_tomorrow_deterministic_plan(&store, "u1", "2024-05-15").await.unwrap();
    assert_eq!(tomorrow.intensity, PlanIntensity::Moderate);
  }

  #[test]
  fn test_intensity_wire_format() {
    assert_eq!(serde_json::to_string(&PlanIntensity::Hard).unwrap(), "\"hård\"");
    let i: PlanIntensity = serde_json::from_str("\"let\"").unwrap();
    assert_eq!(i, PlanIntensity::Light);
  }
}
