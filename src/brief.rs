//! Risk brief orchestrator
//!
//! Assembles profile, manual inputs, today's snapshots and the trailing
//! baseline into one prompt, calls the summarizer and persists the validated
//! result. One brief per (user, day); regeneration overwrites in place.
//! Summarizer output is never trusted: every field is validated or coerced
//! before anything is written.

use serde_json::{json, Value};

use crate::dates::add_days_ymd;
use crate::error::{HealthError, Result};
use crate::insights::BASELINE_WINDOW_DAYS;
use crate::llm::Summarizer;
use crate::models::{AiBrief, BriefInput, BriefSignal, BriefSuggestion, ManualDaily, Risk, Snapshot};
use crate::store::Store;

/// Overstimulation sub-score thresholds. One point per signal, max 5; the
/// score only reaches the prompt at 2 or more.
const OVERSTIM_STRESS_HIGH: f64 = 40.0;
const OVERSTIM_STRESS_RISE: f64 = 10.0;
const OVERSTIM_BB_LOW: f64 = 25.0;
const OVERSTIM_CAFFEINE_CUPS: i64 = 4;
const OVERSTIM_SYMPTOM_SCORE: i64 = 2;
const OVERSTIM_PROMPT_MIN: u8 = 2;

#[derive(Debug)]
pub struct GeneratedBrief {
  pub brief: AiBrief,
  pub risk: Risk,
}

/// Rough 28-day cycle heuristic, used only as prompt context.
pub fn cycle_phase_from_day(cycle_day: Option<i64>) -> Option<&'static str> {
  let day = cycle_day?;
  if day < 1 {
    return None;
  }
  Some(match day {
    1..=5 => "menstruation",
    6..=13 => "follicular",
    14..=16 => "ovulation",
    _ => "luteal",
  })
}

/// 0-5 heuristic combining stress level, stress trend through the day, body
/// battery depletion, caffeine and symptoms. A hint, not a hard signal.
pub fn overstimulation_score(snapshots: &[Snapshot], manual: Option<&ManualDaily>) -> u8 {
  let mut score = 0u8;

  let latest = snapshots.last();
  let latest_stress = latest.and_then(|s| s.metrics.stress_avg);
  let latest_bb_low = latest.and_then(|s| s.metrics.body_battery_low);

  if latest_stress.map(|v| v >= OVERSTIM_STRESS_HIGH).unwrap_or(false) {
    score += 1;
  }

  // Stress rising through the day needs at least two captures with values.
  let stresses: Vec<f64> = snapshots.iter().filter_map(|s| s.metrics.stress_avg).collect();
  if let (Some(first), Some(last)) = (stresses.first(), stresses.last()) {
    if stresses.len() >= 2 && last - first >= OVERSTIM_STRESS_RISE {
      score += 1;
    }
  }

  if latest_bb_low.map(|v| v <= OVERSTIM_BB_LOW).unwrap_or(false) {
    score += 1;
  }

  if let Some(m) = manual {
    if m.caffeine_cups.map(|c| c >= OVERSTIM_CAFFEINE_CUPS).unwrap_or(false) {
      score += 1;
    }
    if m.symptom_score.map(|s| s >= OVERSTIM_SYMPTOM_SCORE).unwrap_or(false) {
      score += 1;
    }
  }

  score
}

fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
  let xs: Vec<f64> = values.flatten().filter(|v| v.is_finite()).collect();
  if xs.is_empty() {
    return None;
  }
  Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

/// Latest capture per day, ordered by day. Input is ascending by (day, taken_at).
fn dedup_latest_per_day(rows: Vec<Snapshot>) -> Vec<Snapshot> {
  let mut out: Vec<Snapshot> = Vec::new();
  for row in rows {
    match out.last_mut() {
      Some(last) if last.day == row.day => {
        if row.taken_at >= last.taken_at {
          *last = row;
        }
      }
      _ => out.push(row),
    }
  }
  out
}

fn snapshot_prompt_fields(s: &Snapshot) -> Value {
  json!({
    "takenAt": s.taken_at.to_rfc3339(),
    "steps": s.metrics.steps,
    "restingHr": s.metrics.resting_hr,
    "stressAvg": s.metrics.stress_avg,
    "sleepHours": s.metrics.sleep_hours,
    "bodyBatteryHigh": s.metrics.body_battery_high,
    "bodyBatteryLow": s.metrics.body_battery_low,
    "spo2Avg": s.metrics.spo2_avg,
    "respAvgWaking": s.metrics.resp_avg_waking,
    "respAvgSleep": s.metrics.resp_avg_sleep,
  })
}

/// Generate (or regenerate) the brief for one user+day. Hard precondition:
/// at least one snapshot must exist for the day; nothing is written otherwise.
pub async fn generate_brief(
  store: &impl Store,
  summarizer: &impl Summarizer,
  user_id: &str,
  day: &str,
) -> Result<GeneratedBrief> {
  let snapshots_today = store.list_snapshots_by_day(user_id, day).await?;
  if snapshots_today.is_empty() {
    return Err(HealthError::NoSnapshots { day: day.to_string() });
  }

  let profile = store.get_profile(user_id).await?;
  let manual = store.get_manual(user_id, day).await?;

  // Baseline: the 14 days strictly before today, one capture per day.
  let from_day = add_days_ymd(day, -BASELINE_WINDOW_DAYS)?;
  let to_day = add_days_ymd(day, -1)?;
  let baseline_rows = store.list_snapshots_by_range(user_id, &from_day, &to_day).await?;
  let baseline = dedup_latest_per_day(baseline_rows);

  let baseline_avg = json!({
    "restingHr": mean(baseline.iter().map(|s| s.metrics.resting_hr)),
    "stressAvg": mean(baseline.iter().map(|s| s.metrics.stress_avg)),
    "sleepHours": mean(baseline.iter().map(|s| s.metrics.sleep_hours)),
    "bodyBatteryLow": mean(baseline.iter().map(|s| s.metrics.body_battery_low)),
  });

  let todays_latest = snapshots_today.last().map(snapshot_prompt_fields);
  let overstim = overstimulation_score(&snapshots_today, manual.as_ref());

  let mut data = json!({
    "day": day,
    "profile": {
      "sex": profile.sex,
      "pregnant": profile.pregnant,
      "cycleDay": profile.cycle_day,
      "cyclePhase": cycle_phase_from_day(profile.cycle_day),
    },
    "manual": manual.as_ref().map(|m| json!({
      "symptomScore": m.symptom_score,
      "caffeineCups": m.caffeine_cups,
      "alcoholUnits": m.alcohol_units,
      "notes": m.notes,
      "trained": m.trained,
      "meds": m.meds,
    })),
    "snapshots": snapshots_today.iter().map(snapshot_prompt_fields).collect::<Vec<_>>(),
    "baselineAvg": baseline_avg,
    "todaysLatest": todays_latest,
  });
  if overstim >= OVERSTIM_PROMPT_MIN {
    data["overstimulationScore"] = json!(overstim);
  }

  let prompt = format!(
    "Opgave: Lav et sygdom/overbelastnings-brief for i dag ({day}).\n\
     Tag højde for profil-kontekst (sex, evt graviditet, cycleDay/cyclePhase) når du vurderer signaler og forslag.\n\
     Hvis profile.sex=female og cyclePhase findes: nævn kort om variation i fx RHR/stress/søvn kan hænge sammen med cyklus (uden at overforklare).\n\n\
     Returnér JSON med præcis denne struktur:\n\
     {{\n  \"risk\": \"OK\"|\"LOW\"|\"MED\"|\"HIGH\",\n  \"short\": string,\n  \"signals\": [{{\"name\": string, \"value\": string, \"why\": string}}],\n  \"suggestions\": [{{\"title\": string, \"detail\": string}}]\n}}\n\n\
     Data (JSON):\n{data}"
  );

  let ai = summarizer.summarize(&prompt).await?;

  let risk = ai
    .get("risk")
    .and_then(Value::as_str)
    .map(Risk::parse_lenient)
    .unwrap_or(Risk::Low);

  let short = ai.get("short").and_then(Value::as_str).unwrap_or_default().to_string();

  let signals: Vec<BriefSignal> = ai
    .get("signals")
    .and_then(Value::as_array)
    .map(|arr| {
      arr
        .iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect()
    })
    .unwrap_or_default();

  let mut suggestions: Vec<BriefSuggestion> = ai
    .get("suggestions")
    .and_then(Value::as_array)
    .map(|arr| {
      arr
        .iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect()
    })
    .unwrap_or_default();

  // Field-tracking hints become a synthesized first suggestion.
  let track: Vec<&str> = ai
    .get("track")
    .and_then(Value::as_array)
    .map(|arr| arr.iter().filter_map(Value::as_str).collect())
    .unwrap_or_default();
  if !track.is_empty() {
    suggestions.insert(
      0,
      BriefSuggestion {
        title: "Hold øje med".to_string(),
        detail: track.join(", "),
      },
    );
  }

  let input = BriefInput {
    day: day.to_string(),
    risk,
    short,
    signals,
    suggestions,
    model: summarizer.model().to_string(),
  };

  let brief = store.upsert_brief(user_id, &input).await?;
  Ok(GeneratedBrief { risk, brief })
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
