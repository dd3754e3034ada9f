//! Dual-mode result printing: `--json` emits the raw value, otherwise a
//! caller-supplied closure renders a human-readable summary.

use serde::Serialize;

pub fn print_json<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T)) {
  if json {
    match serde_json::to_string_pretty(value) {
      Ok(text) => println!("{text}"),
      Err(e) => eprintln!("failed to serialize result: {e}"),
    }
  } else {
    human(value);
  }
}
