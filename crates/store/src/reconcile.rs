//! Delete and rename reconciliation under full-scan semantics (spec
//! component C6, algorithm shared with the Version Store since it issues
//! direct backend queries). Grounded on `original_source/rewindex/indexing.py`'s
//! `_mark_missing_as_deleted`, generalized to use scroll pagination per
//! `SPEC_FULL.md`/spec.md §4.6 rather than the original's unpaginated
//! 10,000-size query.

use std::collections::{HashMap, HashSet};

use rewindex_core::{FileRecord, ProjectId, Result};
use serde_json::json;

use crate::VersionStore;

const SCROLL_BATCH_SIZE: usize = 10_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
  pub deleted: usize,
  pub renamed: usize,
}

/// `present_paths` is the set of eligible paths observed on disk during the
/// scan. `new_hash_to_paths` maps each observed content hash to every path
/// that held it during this scan, used to link a disappearance to an
/// appearance of the same content under a new path. When more than one
/// candidate new path shares a hash, the lexicographically smallest is
/// chosen (spec.md §9's explicit tiebreak).
pub async fn reconcile(
  store: &VersionStore,
  project_id: ProjectId,
  present_paths: &HashSet<String>,
  new_hash_to_paths: &HashMap<String, Vec<String>>,
) -> Result<ReconcileOutcome> {
  let current_records = fetch_current_records(store, project_id).await?;

  let mut outcome = ReconcileOutcome::default();
  let now_ms = chrono::Utc::now().timestamp_millis();

  for record in current_records {
    if present_paths.contains(&record.relative_path) {
      continue;
    }

    store.mark_deleted(project_id, &record.relative_path, now_ms).await?;
    outcome.deleted += 1;

    if let Some(candidates) = new_hash_to_paths.get(&record.content_hash) {
      if let Some(new_path) = candidates
        .iter()
        .filter(|p| p.as_str() != record.relative_path.as_str())
        .min()
      {
        store.mark_renamed(project_id, &record.relative_path, new_path).await?;
        outcome.renamed += 1;
      }
    }
  }

  Ok(outcome)
}

async fn fetch_current_records(store: &VersionStore, project_id: ProjectId) -> Result<Vec<FileRecord>> {
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

  let mut records = Vec::new();
  let mut page = store.backend().scroll_start(store.files_index(), query, SCROLL_BATCH_SIZE).await?;
  loop {
    for hit in page.hits.drain(..) {
      if let Ok(record) = serde_json::from_value::<FileRecord>(hit.source) {
        records.push(record);
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

  Ok(records)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::memory_backend::MemoryBackend;
  use crate::{FileStat, VersionStore};
  use rewindex_core::{Config, GitProvenance, Project, SymbolHints};
  use std::sync::Arc;

  async fn seeded_store() -> (VersionStore, ProjectId) {
    let cfg = Config::default();
    let backend: Arc<dyn rewindex_backend::SearchBackend> = Arc::new(MemoryBackend::default());
    let store = VersionStore::new(backend, &cfg);
    let project = Project::new(std::env::temp_dir(), "demo");
    (store, project.id)
  }

  #[tokio::test]
  async fn missing_path_is_marked_deleted() {
    let (store, pid) = seeded_store().await;
    store
      .upsert_file(pid, "a.py", b"x", Some("x"), FileStat { size_bytes: 1, last_modified: 1 }, "plaintext", "py", SymbolHints::default(), GitProvenance::default(), 1)
      .await
      .unwrap();

    let present = HashSet::new();
    let outcome = reconcile(&store, pid, &present, &HashMap::new()).await.unwrap();
    assert_eq!(outcome.deleted, 1);
    assert_eq!(outcome.renamed, 0);

    let record = store.current(pid, "a.py").await.unwrap().unwrap();
    assert!(record.deleted);
  }

  #[tokio::test]
  async fn rename_links_old_and_new_path_on_matching_hash() {
    let (store, pid) = seeded_store().await;
    store
      .upsert_file(pid, "src/a.py", b"X", Some("X"), FileStat { size_bytes: 1, last_modified: 1 }, "python", "py", SymbolHints::default(), GitProvenance::default(), 1)
      .await
      .unwrap();

    let present: HashSet<String> = HashSet::from(["src/b.py".to_string()]);
    let mut hash_map = HashMap::new();
    hash_map.insert(crate::sha256_hex(b"X"), vec!["src/b.py".to_string()]);

    let outcome = reconcile(&store, pid, &present, &hash_map).await.unwrap();
    assert_eq!(outcome.deleted, 1);
    assert_eq!(outcome.renamed, 1);

    let old_record = store.current(pid, "src/a.py").await.unwrap().unwrap();
    assert_eq!(old_record.renamed_to.as_deref(), Some("src/b.py"));
  }

  #[tokio::test]
  async fn rename_tiebreak_picks_lexicographically_smallest_path() {
    let (store, pid) = seeded_store().await;
    store
      .upsert_file(pid, "a.py", b"X", Some("X"), FileStat { size_bytes: 1, last_modified: 1 }, "python", "py", SymbolHints::default(), GitProvenance::default(), 1)
      .await
      .unwrap();

    let present: HashSet<String> = HashSet::from(["z.py".to_string(), "b.py".to_string()]);
    let mut hash_map = HashMap::new();
    hash_map.insert(crate::sha256_hex(b"X"), vec!["z.py".to_string(), "b.py".to_string()]);

    reconcile(&store, pid, &present, &hash_map).await.unwrap();
    let old_record = store.current(pid, "a.py").await.unwrap().unwrap();
    assert_eq!(old_record.renamed_to.as_deref(), Some("b.py"));
  }

  #[tokio::test]
  async fn present_path_is_left_untouched() {
    let (store, pid) = seeded_store().await;
    store
      .upsert_file(pid, "a.py", b"x", Some("x"), FileStat { size_bytes: 1, last_modified: 1 }, "plaintext", "py", SymbolHints::default(), GitProvenance::default(), 1)
      .await
      .unwrap();
    let present: HashSet<String> = HashSet::from(["a.py".to_string()]);
    let outcome = reconcile(&store, pid, &present, &HashMap::new()).await.unwrap();
    assert_eq!(outcome.deleted, 0);
    let record = store.current(pid, "a.py").await.unwrap().unwrap();
    assert!(!record.deleted);
    assert!(record.is_current);
  }
}
