//! health-trend: personal biometric trend engine
//!
//! Ingests raw wearable export payloads into per-day snapshots, derives daily
//! signals (baseline, sleep debt, streaks, early warnings), computes a
//! deterministic day plan and orchestrates an AI risk brief per user per day.

pub mod activities;
pub mod brief;
pub mod config;
pub mod dates;
pub mod error;
pub mod garmin;
pub mod insights;
pub mod llm;
pub mod models;
pub mod plan;
pub mod rate_limit;
pub mod runner;
pub mod store;
pub mod trends;

#[cfg(test)]
mod test_utils;

pub use config::Config;
pub use error::{HealthError, Result};
