//! Version Store (spec component C5): enforces the data-model invariants
//! in `SPEC_FULL.md` §4 / the original spec's §3 atop the Search Backend
//! Abstraction (C4).

mod reconcile;
#[cfg(any(test, feature = "test-support"))]
mod memory_backend;

pub use reconcile::{ReconcileOutcome, reconcile};
#[cfg(feature = "test-support")]
pub use memory_backend::MemoryBackend;

use std::sync::Arc;

use rewindex_core::{Config, FileRecord, GitProvenance, ProjectId, Result, SymbolHints, VersionRecord, line_count};
use rewindex_backend::SearchBackend;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
  Added,
  Updated,
  Unchanged,
}

#[derive(Debug, Clone, Copy)]
pub struct FileStat {
  pub size_bytes: u64,
  pub last_modified: i64,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(bytes);
  hex::encode(hasher.finalize())
}

pub struct VersionStore {
  backend: Arc<dyn SearchBackend>,
  files_index: String,
  versions_index: String,
}

impl VersionStore {
  pub fn new(backend: Arc<dyn SearchBackend>, config: &Config) -> Self {
    VersionStore {
      backend,
      files_index: config.files_index_name(),
      versions_index: config.versions_index_name(),
    }
  }

  /// Creates both indices if absent. Idempotent.
  pub async fn ensure_indices(&self) -> Result<()> {
    if !self.backend.index_exists(&self.files_index).await? {
      self
        .backend
        .create_index(&self.files_index, rewindex_backend::schema::files_index_body())
        .await?;
    }
    if !self.backend.index_exists(&self.versions_index).await? {
      self
        .backend
        .create_index(&self.versions_index, rewindex_backend::schema::versions_index_body())
        .await?;
    }
    Ok(())
  }

  pub async fn refresh_all(&self) -> Result<()> {
    self.backend.refresh(&self.files_index).await?;
    self.backend.refresh(&self.versions_index).await?;
    Ok(())
  }

  /// The 7-step algorithm from the original spec's §4.5.
  #[allow(clippy::too_many_arguments)]
  pub async fn upsert_file(
    &self,
    project_id: ProjectId,
    relative_path: &str,
    raw_bytes: &[u8],
    text_content: Option<&str>,
    stat: FileStat,
    language: &str,
    extension: &str,
    hints: SymbolHints,
    git: GitProvenance,
    now_ms: i64,
  ) -> Result<UpsertOutcome> {
    let hash = sha256_hex(raw_bytes);
    let content = text_content.unwrap_or("");

    let doc_id = FileRecord::doc_id(project_id, relative_path);
    let existing = self.backend.get(&self.files_index, &doc_id).await?;
    let prev_hash = existing
      .as_ref()
      .and_then(|v| v.get("content_hash"))
      .and_then(|v| v.as_str())
      .map(str::to_string);

    if prev_hash.as_deref() == Some(hash.as_str()) {
      if let Some(mut doc) = existing {
        doc["indexed_at"] = json!(now_ms);
        doc["last_modified"] = json!(stat.last_modified);
        self.backend.put(&self.files_index, &doc_id, doc).await?;
      }
      return Ok(UpsertOutcome::Unchanged);
    }

    let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path).to_string();
    let record = FileRecord {
      project_id,
      relative_path: relative_path.to_string(),
      content_hash: hash.clone(),
      previous_hash: prev_hash.clone(),
      is_current: true,
      deleted: false,
      deleted_at: None,
      renamed_from: None,
      renamed_to: None,
      language: language.to_string(),
      extension: extension.to_string(),
      file_name,
      size_bytes: stat.size_bytes,
      line_count: line_count(content),
      last_modified: stat.last_modified,
      indexed_at: now_ms,
      hints,
      git,
      content: content.to_string(),
    };
    self
      .backend
      .put(&self.files_index, &doc_id, serde_json::to_value(&record).map_err(|e| {
        rewindex_core::RewindexError::Parse(e.to_string())
      })?)
      .await?;

    if let Some(prev) = &prev_hash {
      if let Some(mut prev_version) = self.backend.get(&self.versions_index, prev).await? {
        prev_version["is_current"] = json!(false);
        self.backend.put(&self.versions_index, prev, prev_version).await?;
      }
    }

    let version = VersionRecord {
      file_path: relative_path.to_string(),
      content_hash: hash.clone(),
      previous_hash: prev_hash.clone(),
      created_at: now_ms,
      is_current: true,
      content: content.to_string(),
      language: language.to_string(),
      project_id,
    };
    self
      .backend
      .put(&self.versions_index, &hash, serde_json::to_value(&version).map_err(|e| {
        rewindex_core::RewindexError::Parse(e.to_string())
      })?)
      .await?;

    Ok(if prev_hash.is_none() { UpsertOutcome::Added } else { UpsertOutcome::Updated })
  }

  pub async fn mark_deleted(&self, project_id: ProjectId, relative_path: &str, now_ms: i64) -> Result<()> {
    let doc_id = FileRecord::doc_id(project_id, relative_path);
    if let Some(mut doc) = self.backend.get(&self.files_index, &doc_id).await? {
      doc["is_current"] = json!(false);
      doc["deleted"] = json!(true);
      doc["deleted_at"] = json!(now_ms);
      self.backend.put(&self.files_index, &doc_id, doc).await?;
    }
    Ok(())
  }

  pub async fn mark_renamed(&self, project_id: ProjectId, old_path: &str, new_path: &str) -> Result<()> {
    let old_id = FileRecord::doc_id(project_id, old_path);
    if let Some(mut doc) = self.backend.get(&self.files_index, &old_id).await? {
      doc["renamed_to"] = json!(new_path);
      self.backend.put(&self.files_index, &old_id, doc).await?;
    }
    let new_id = FileRecord::doc_id(project_id, new_path);
    if let Some(mut doc) = self.backend.get(&self.files_index, &new_id).await? {
      doc["renamed_from"] = json!(old_path);
      self.backend.put(&self.files_index, &new_id, doc).await?;
    }
    Ok(())
  }

  pub async fn current(&self, project_id: ProjectId, relative_path: &str) -> Result<Option<FileRecord>> {
    let doc_id = FileRecord::doc_id(project_id, relative_path);
    match self.backend.get(&self.files_index, &doc_id).await? {
      Some(v) => Ok(Some(from_value(v)?)),
      None => Ok(None),
    }
  }

  pub async fn version_by_hash(&self, hash: &str) -> Result<Option<VersionRecord>> {
    match self.backend.get(&self.versions_index, hash).await? {
      Some(v) => Ok(Some(from_value(v)?)),
      None => Ok(None),
    }
  }

  /// Newest-first by `created_at`.
  pub async fn history(&self, project_id: ProjectId, relative_path: &str, limit: usize) -> Result<Vec<VersionRecord>> {
    let query = json!({
      "query": {
        "bool": {
          "filter": [
            { "term": { "file_path": relative_path } },
            { "term": { "project_id": project_id.as_str() } }
          ]
        }
      },
      "sort": [{ "created_at": "desc" }],
      "size": limit,
    });
    let resp = self.backend.search(&self.versions_index, query).await?;
    resp.hits.into_iter().map(|h| from_value(h.source)).collect()
  }

  /// Latest version with `created_at <= ts_ms`, or absent if none.
  pub async fn at(&self, project_id: ProjectId, relative_path: &str, ts_ms: i64) -> Result<Option<VersionRecord>> {
    let query = json!({
      "query": {
        "bool": {
          "filter": [
            { "term": { "file_path": relative_path } },
            { "term": { "project_id": project_id.as_str() } },
            { "range": { "created_at": { "lte": ts_ms } } }
          ]
        }
      },
      "sort": [{ "created_at": "desc" }],
      "size": 1,
    });
    let resp = self.backend.search(&self.versions_index, query).await?;
    match resp.hits.into_iter().next() {
      Some(h) => Ok(Some(from_value(h.source)?)),
      None => Ok(None),
    }
  }

  pub fn files_index(&self) -> &str {
    &self.files_index
  }

  pub fn versions_index(&self) -> &str {
    &self.versions_index
  }

  pub fn backend(&self) -> &Arc<dyn SearchBackend> {
    &self.backend
  }
}

fn from_value<T: serde::de::DeserializeOwned>(v: Value) -> Result<T> {
  serde_json::from_value(v).map_err(|e| rewindex_core::RewindexError::Parse(e.to_string()))
}
