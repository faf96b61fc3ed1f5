use serde::{Deserialize, Serialize};

/// Risk level of a daily brief or alert. Ordered: OK < LOW < MED < HIGH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Risk {
  #[serde(rename = "OK")]
  Ok,
  #[serde(rename = "LOW")]
  Low,
  #[serde(rename = "MED")]
  Med,
  #[serde(rename = "HIGH")]
  High,
}

impl Risk {
  pub fn as_str(&self) -> &'static str {
    match self {
      Risk::Ok => "OK",
      Risk::Low => "LOW",
      Risk::Med => "MED",
      Risk::High => "HIGH",
    }
  }

  /// Strict parse of the wire value.
  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "OK" => Some(Risk::Ok),
      "LOW" => Some(Risk::Low),
      "MED" => Some(Risk::Med),
      "HIGH" => Some(Risk::High),
      _ => None,
    }
  }

  /// Summarizer output is untrusted; anything unrecognized coerces to LOW.
  pub fn parse_lenient(s: &str) -> Self {
    Self::parse(s).unwrap_or(Risk::Low)
  }

  pub fn is_elevated(&self) -> bool {
    *self >= Risk::Med
  }
}

impl std::fmt::Display for Risk {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
