//! In-process fixed-window rate limiter
//!
//! Per-key counters with a fixed reset-at-expiry window: the first hit opens
//! the window, every hit inside it increments the counter, and the counter
//! resets only when the window expires. Non-durable (resets on process
//! restart) and not safe across multiple processes; acceptable at this
//! deployment scale. Time comes through an injected clock for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub trait Clock {
  fn now_ms(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
  fn now_ms(&self) -> u64 {
    std::time::SystemTime::now()
      .duration_since(std::time::UNIX_EPOCH)
      .map(|d| d.as_millis() as u64)
      .unwrap_or(0)
  }
}

struct Bucket {
  count: u32,
  reset_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
  Allowed { limit: u32, remaining: u32, reset_at_ms: u64 },
  Limited { retry_after_secs: u64 },
}

impl Decision {
  pub fn is_allowed(&self) -> bool {
    matches!(self, Decision::Allowed { .. })
  }
}

pub struct RateLimiter<C: Clock = SystemClock> {
  clock: C,
  buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter<SystemClock> {
  pub fn new() -> Self {
    Self::with_clock(SystemClock)
  }
}

impl Default for RateLimiter<SystemClock> {
  fn default() -> Self {
    Self::new()
  }
}

impl<C: Clock> RateLimiter<C> {
  pub fn with_clock(clock: C) -> Self {
    Self { clock, buckets: Mutex::new(HashMap::new()) }
  }

  /// Count one hit against `key`. The hit is counted even when it ends up
  /// limited, so hammering a limited key never lets it through early.
  pub fn check(&self, key: &str, limit: u32, window: Duration) -> Decision {
    let now = self.clock.now_ms();
    let window_ms = window.as_millis() as u64;

    let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());

    let (count, reset_at_ms) = match buckets.get(key) {
      Some(b) if b.reset_at_ms > now => (b.count + 1, b.reset_at_ms),
      _ => (1, now + window_ms),
    };
    buckets.insert(key.to_string(), Bucket { count, reset_at_ms });

    if count > limit {
      let retry_after_secs = ((reset_at_ms - now) + 999) / 1000;
      return Decision::Limited { retry_after_secs: retry_after_secs.max(1) };
    }

    Decision::Allowed { limit, remaining: limit - count, reset_at_ms }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
