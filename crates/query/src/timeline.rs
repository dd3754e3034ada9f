//! Timeline aggregation (spec.md §4.8): a date histogram over the versions
//! index with fixed 5-minute buckets, empty buckets preserved, downsampled
//! by striding if the raw bucket count would exceed 500.

use rewindex_backend::SearchBackend;
use rewindex_core::{ProjectId, Result};
use serde_json::{Value, json};

use crate::types::{TimelineBucket, TimelineOutcome};

const BUCKET_MS: i64 = 5 * 60 * 1000;
const MAX_BUCKETS: usize = 500;

pub async fn timeline(backend: &dyn SearchBackend, versions_index: &str, project_id: ProjectId, file_paths: Option<&[String]>) -> Result<TimelineOutcome> {
  let mut filter: Vec<Value> = vec![json!({ "term": { "project_id": project_id.as_str() } })];
  if let Some(paths) = file_paths {
    if !paths.is_empty() {
      filter.push(json!({ "terms": { "file_path": paths } }));
    }
  }

  let query = json!({
    "query": { "bool": { "filter": filter } },
    "size": 0,
    "aggs": {
      "timeline": {
        "date_histogram": {
          "field": "created_at",
          "fixed_interval": "5m",
          "min_doc_count": 0,
        }
      }
    }
  });

  let response = backend.search(versions_index, query).await?;
  let raw_buckets: Vec<TimelineBucket> = response
    .aggregations
    .as_ref()
    .and_then(|agg| agg.get("timeline"))
    .and_then(|t| t.get("buckets"))
    .and_then(|b| b.as_array())
    .map(|arr| {
      arr
        .iter()
        .filter_map(|b| {
          let start = b.get("key").and_then(|v| v.as_i64())?;
          let count = b.get("doc_count").and_then(|v| v.as_u64()).unwrap_or(0);
          Some(TimelineBucket { bucket_start_ms: start, count })
        })
        .collect()
    })
    .unwrap_or_default();

  Ok(downsample(raw_buckets))
}

/// Strides through buckets so at most `MAX_BUCKETS` survive, summing the
/// counts absorbed into each retained bucket rather than dropping data.
fn downsample(buckets: Vec<TimelineBucket>) -> TimelineOutcome {
  if buckets.len() <= MAX_BUCKETS {
    return TimelineOutcome { buckets, downsampled: false };
  }

  let stride = buckets.len().div_ceil(MAX_BUCKETS);
  let mut result = Vec::with_capacity(MAX_BUCKETS);
  for chunk in buckets.chunks(stride) {
    let bucket_start_ms = chunk[0].bucket_start_ms;
    let count = chunk.iter().map(|b| b.count).sum();
    result.push(TimelineBucket { bucket_start_ms, count });
  }
  TimelineOutcome { buckets: result, downsampled: true }
}

pub fn bucket_span_ms() -> i64 {
  BUCKET_MS
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn downsample_leaves_small_sets_untouched() {
    let buckets = vec![TimelineBucket { bucket_start_ms: 0, count: 1 }, TimelineBucket { bucket_start_ms: BUCKET_MS, count: 2 }];
    let outcome = downsample(buckets.clone());
    assert_eq!(outcome.buckets, buckets);
    assert!(!outcome.downsampled);
  }

  #[test]
  fn downsample_caps_at_max_buckets_and_preserves_total_count() {
    let buckets: Vec<TimelineBucket> = (0..1200).map(|i| TimelineBucket { bucket_start_ms: i as i64 * BUCKET_MS, count: 1 }).collect();
    let total_before: u64 = buckets.iter().map(|b| b.count).sum();
    let outcome = downsample(buckets);
    assert!(outcome.downsampled);
    assert!(outcome.buckets.len() <= MAX_BUCKETS);
    let total_after: u64 = outcome.buckets.iter().map(|b| b.count).sum();
    assert_eq!(total_before, total_after);
  }
}
