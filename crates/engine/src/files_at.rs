//! `files_at` (spec.md §6): the set of paths and their content hash/language
//! present at a given moment, derived from the versions index's per-path
//! latest-at-or-before-timestamp snapshot, minus anything the current-files
//! index records as deleted at or before that same moment.

use std::collections::HashMap;

use rewindex_core::{ProjectId, Result};
use serde_json::json;

use crate::types::PathSnapshot;
use rewindex_store::VersionStore;

const SCROLL_BATCH_SIZE: usize = 10_000;

pub async fn files_at(store: &VersionStore, project_id: ProjectId, ts_ms: i64) -> Result<Vec<PathSnapshot>> {
  let mut latest: HashMap<String, (i64, PathSnapshot)> = HashMap::new();

  let query = json!({
    "query": {
      "bool": {
        "filter": [
          { "term": { "project_id": project_id.as_str() } },
          { "range": { "created_at": { "lte": ts_ms } } }
        ]
      }
    }
  });

  let mut page = store.backend().scroll_start(store.versions_index(), query, SCROLL_BATCH_SIZE).await?;
  loop {
    for hit in page.hits.drain(..) {
      let Some(path) = hit.source.get("file_path").and_then(|v| v.as_str()) else { continue };
      let Some(created_at) = hit.source.get("created_at").and_then(|v| v.as_i64()) else { continue };
      let should_insert = latest.get(path).is_none_or(|(existing_ts, _)| created_at > *existing_ts);
      if should_insert {
        let content_hash = hit.source.get("content_hash").and_then(|v| v.as_str()).unwrap_or("").to_string();
        let language = hit.source.get("language").and_then(|v| v.as_str()).unwrap_or("plaintext").to_string();
        latest.insert(path.to_string(), (created_at, PathSnapshot { relative_path: path.to_string(), content_hash, language }));
      }
    }
    match &page.scroll_id {
      Some(id) => {
        let id = id.clone();
        page = store.backend().scroll_next(&id).await?;
        if page.hits.is_empty() {
          let _ = store.backend().scroll_clear(&id).await;
          break;
        }
      }
      None => break,
    }
  }

  let deleted_by_path = fetch_deleted_at_or_before(store, project_id, ts_ms).await?;

  let mut results: Vec<PathSnapshot> = latest
    .into_iter()
    .filter(|(path, _)| deleted_by_path.get(path).is_none_or(|deleted_at| *deleted_at > ts_ms))
    .map(|(_, (_, snapshot))| snapshot)
    .collect();
  results.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
  Ok(results)
}

async fn fetch_deleted_at_or_before(store: &VersionStore, project_id: ProjectId, ts_ms: i64) -> Result<HashMap<String, i64>> {
  let query = json!({
    "query": {
      "bool": {
        "filter": [
          { "term": { "project_id": project_id.as_str() } },
          { "term": { "deleted": true } },
          { "range": { "deleted_at": { "lte": ts_ms } } }
        ]
      }
    }
  });

  let mut deleted = HashMap::new();
  let mut page = store.backend().scroll_start(store.files_index(), query, SCROLL_BATCH_SIZE).await?;
  loop {
    for hit in page.hits.drain(..) {
      let Some(path) = hit.source.get("relative_path").and_then(|v| v.as_str()) else { continue };
      let Some(deleted_at) = hit.source.get("deleted_at").and_then(|v| v.as_i64()) else { continue };
      deleted.insert(path.to_string(), deleted_at);
    }
    match &page.scroll_id {
      Some(id) => {
        let id = id.clone();
        page = store.backend().scroll_next(&id).await?;
        if page.hits.is_empty() {
          let _ = store.backend().scroll_clear(&id).await;
          break;
        }
      }
      None => break,
    }
  }
  Ok(deleted)
}
