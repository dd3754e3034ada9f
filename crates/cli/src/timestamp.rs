//! Accepts either a millisecond epoch integer or an RFC 3339 timestamp on
//! the command line, since users will reach for whichever is convenient.

use anyhow::{Context, Result, anyhow};
use chrono::DateTime;

pub fn parse_timestamp(input: &str) -> Result<i64> {
  if let Ok(ms) = input.parse::<i64>() {
    return Ok(ms);
  }
  DateTime::parse_from_rfc3339(input)
    .map(|dt| dt.timestamp_millis())
    .map_err(|e| anyhow!("{e}"))
    .with_context(|| format!("'{input}' is neither a millisecond epoch nor an RFC 3339 timestamp"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_epoch_millis() {
    assert_eq!(parse_timestamp("1700000000000").unwrap(), 1_700_000_000_000);
  }

  #[test]
  fn parses_rfc3339() {
    let parsed = parse_timestamp("2026-01-01T00:00:00Z").unwrap();
    assert_eq!(parsed, DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().timestamp_millis());
  }

  #[test]
  fn rejects_garbage() {
    assert!(parse_timestamp("not-a-timestamp").is_err());
  }
}
