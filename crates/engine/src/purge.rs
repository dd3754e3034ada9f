//! `purge_ignored` (spec.md §6): re-evaluates every currently-indexed path
//! against the live ignore rules and removes anything that would no longer
//! be eligible — e.g. a `.gitignore` entry added after the file was first
//! indexed.

use rewindex_core::{ProjectId, Result};
use rewindex_match::Matcher;
use serde_json::json;

use crate::types::PurgeOutcome;
use rewindex_store::VersionStore;

const SCROLL_BATCH_SIZE: usize = 10_000;

pub async fn purge_ignored(store: &VersionStore, matcher: &Matcher, project_id: ProjectId, dry_run: bool) -> Result<PurgeOutcome> {
  let query = json!({
    "query": {
      "bool": {
        "filter": [
          { "term": { "project_id": project_id.as_str() } },
          { "term": { "is_current": true } }
        ]
      }
    }
  });

  let mut to_remove = Vec::new();
  let mut page = store.backend().scroll_start(store.files_index(), query, SCROLL_BATCH_SIZE).await?;
  loop {
    for hit in page.hits.drain(..) {
      let Some(path) = hit.source.get("relative_path").and_then(|v| v.as_str()) else { continue };
      if !matcher.is_eligible(path, None) {
        to_remove.push(path.to_string());
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

  let mut outcome = PurgeOutcome { files_removed: to_remove.len(), versions_removed: 0, dry_run };
  if dry_run {
    return Ok(outcome);
  }

  for path in &to_remove {
    let file_delete_query = json!({
      "query": {
        "bool": {
          "filter": [
            { "term": { "project_id": project_id.as_str() } },
            { "term": { "relative_path": path } }
          ]
        }
      }
    });
    store.backend().delete_by_query(store.files_index(), file_delete_query).await?;

    let version_delete_query = json!({
      "query": {
        "bool": {
          "filter": [
            { "term": { "project_id": project_id.as_str() } },
            { "term": { "file_path": path } }
          ]
        }
      }
    });
    outcome.versions_removed += store.backend().delete_by_query(store.versions_index(), version_delete_query).await?;
  }

  Ok(outcome)
}
