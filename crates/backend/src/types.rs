use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
  pub id: String,
  pub score: f32,
  #[serde(rename = "_source")]
  pub source: Value,
  #[serde(default)]
  pub highlight: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
  pub total_hits: u64,
  pub hits: Vec<SearchHit>,
  pub took_ms: Option<u64>,
  #[serde(default)]
  pub aggregations: Option<Value>,
}

/// One page of a scrolled query. `scroll_id` is `None` once the scroll is
/// exhausted or was never established (empty result set).
#[derive(Debug, Clone, Default)]
pub struct ScrollPage {
  pub hits: Vec<SearchHit>,
  pub scroll_id: Option<String>,
}
