//! Query Engine request/response types (spec.md §4.8). Grounded on
//! `original_source/rewindex/search.py`'s `SearchFilters`/`SearchOptions`
//! dataclasses, translated to a typed Rust API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
  pub language: Option<Vec<String>>,
  pub path_pattern: Option<String>,
  pub path_prefix: Option<String>,
  pub file_types: Option<Vec<String>>,
  pub exclude_paths: Option<String>,
  pub has_function: Option<String>,
  pub has_class: Option<String>,
  pub is_current: Option<bool>,
  pub created_before_ms: Option<i64>,
  pub file_paths: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOptions {
  pub limit: usize,
  pub context_lines: usize,
  pub highlight: bool,
  pub fuzziness: Option<String>,
  pub partial: bool,
  pub show_deleted: bool,
}

impl Default for SearchOptions {
  fn default() -> Self {
    SearchOptions { limit: 20, context_lines: 3, highlight: true, fuzziness: None, partial: false, show_deleted: false }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSpan {
  pub line: u32,
  pub highlight: String,
  pub context: MatchContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchContext {
  pub before: Vec<String>,
  pub after: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultMetadata {
  pub size_bytes: u64,
  pub functions: Vec<String>,
  pub classes: Vec<String>,
  pub imports: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHitResult {
  pub file_path: String,
  pub score: f32,
  pub language: String,
  pub matches: Vec<MatchSpan>,
  pub metadata: ResultMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
  pub total_hits: usize,
  pub results: Vec<SearchHitResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineBucket {
  pub bucket_start_ms: i64,
  pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineOutcome {
  pub buckets: Vec<TimelineBucket>,
  pub downsampled: bool,
}
