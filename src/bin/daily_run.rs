//! Batch entrypoint the external scheduler invokes once per day.
//!
//! Usage: daily-run [--day YYYY-MM-DD] [--snapshot-only] <user-id>...
//!
//! Iterates the given users sequentially and runs the daily pipeline for each,
//! printing one JSON result line per user.

use std::process::ExitCode;

use health_trend::llm::{OpenAiClient, Summarizer};
use health_trend::runner::{run_daily_for_user, RunMode, UserRunResult};
use health_trend::store::AnyStore;
use health_trend::{Config, HealthError};

/// Stands in when no API key is configured; only valid for snapshot-only runs.
struct UnconfiguredSummarizer;

impl Summarizer for UnconfiguredSummarizer {
  async fn summarize(&self, _prompt: &str) -> health_trend::Result<serde_json::Value> {
    Err(HealthError::MissingConfig("OPENAI_API_KEY".into()))
  }

  fn model(&self) -> &str {
    "unconfigured"
  }
}

struct Args {
  day: String,
  mode: RunMode,
  users: Vec<String>,
}

fn parse_args() -> Result<Args, String> {
  let mut day = health_trend::dates::today_ymd();
  let mut mode = RunMode::SnapshotAndBrief;
  let mut users = Vec::new();

  let mut argv = std::env::args().skip(1);
  while let Some(arg) = argv.next() {
    match arg.as_str() {
      "--day" => {
        let value = argv.next().ok_or("--day requires a value")?;
        if !health_trend::dates::is_valid_day(&value) {
          return Err(format!("bad --day value: {value}"));
        }
        day = value;
      }
      "--snapshot-only" => mode = RunMode::SnapshotOnly,
      other if other.starts_with('-') => return Err(format!("unknown flag: {other}")),
      user => users.push(user.to_string()),
    }
  }

  if users.is_empty() {
    return Err("at least one user id is required".to_string());
  }

  Ok(Args { day, mode, users })
}

#[tokio::main]
async fn main() -> ExitCode {
  dotenvy::dotenv().ok();
  env_logger::init();

  let args = match parse_args() {
    Ok(args) => args,
    Err(e) => {
      eprintln!("daily-run: {e}");
      eprintln!("usage: daily-run [--day YYYY-MM-DD] [--snapshot-only] <user-id>...");
      return ExitCode::FAILURE;
    }
  };

  let config = Config::from_env();
  let store = AnyStore::shared(&config).await;

  log::info!("daily_run_started day={} users={}", args.day, args.users.len());

  let mut results: Vec<UserRunResult> = Vec::new();
  match OpenAiClient::from_config(&config) {
    Ok(summarizer) => {
      for user_id in &args.users {
        results
          .push(run_daily_for_user(store, &summarizer, &config, user_id, &args.day, args.mode).await);
      }
    }
    Err(e) => {
      // Snapshot-only runs don't need the summarizer.
      if args.mode == RunMode::SnapshotAndBrief {
        eprintln!("daily-run: {e}");
        return ExitCode::FAILURE;
      }
      for user_id in &args.users {
        results.push(
          run_daily_for_user(store, &UnconfiguredSummarizer, &config, user_id, &args.day, args.mode)
            .await,
        );
      }
    }
  }

  let mut all_ok = true;
  for result in &results {
    all_ok &= result.snapshot.ok && result.brief.as_ref().map(|b| b.ok).unwrap_or(true);
    match serde_json::to_string(result) {
      Ok(line) => println!("{line}"),
      Err(e) => log::warn!("unserializable run result for {}: {e}", result.user_id),
    }
  }

  log::info!("daily_run_finished day={} ok={all_ok}", args.day);

  if all_ok {
    ExitCode::SUCCESS
  } else {
    ExitCode::FAILURE
  }
}
