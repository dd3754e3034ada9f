//! Per-file indexing (shared by the change detector and the watcher
//! supervisor's full scan) and full-scan reconciliation (spec component
//! C6/C7). Grounded on `original_source/rewindex/indexing.py::index_project`
//! and `index_single_file`, generalized per spec.md §4.6: deletions and
//! renames are never applied from a single event, only from reconciliation.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use rewindex_classify::{detect_language, extract_metadata, is_binary_file};
use rewindex_core::{Config, ProjectId, Result};
use rewindex_match::Matcher;
use rewindex_store::{FileStat, ReconcileOutcome, VersionStore, reconcile};
use walkdir::WalkDir;

use crate::git;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFileOutcome {
  Added,
  Updated,
  Unchanged,
  /// Binary and `index_binaries` is disabled, or unreadable.
  Skipped,
}

/// Shared, read-only context for indexing one path at a time.
pub struct IndexContext {
  pub root: std::path::PathBuf,
  pub project_id: ProjectId,
  pub matcher: Arc<Matcher>,
  pub store: Arc<VersionStore>,
  pub index_binaries: bool,
  pub extract_enabled: bool,
  pub track_git: bool,
}

impl IndexContext {
  pub fn new(root: impl Into<std::path::PathBuf>, project_id: ProjectId, config: &Config, store: Arc<VersionStore>) -> Self {
    IndexContext {
      root: root.into(),
      project_id,
      matcher: Arc::new(Matcher::from_config(config)),
      store,
      index_binaries: config.indexing.index_binaries,
      extract_enabled: config.indexing.extract.functions
        || config.indexing.extract.classes
        || config.indexing.extract.imports
        || config.indexing.extract.todos,
      track_git: true,
    }
  }

  /// Indexes a single eligible path. Caller is responsible for having
  /// already filtered the path through the matcher and for mapping any
  /// `Ok(None)` (path no longer exists) without treating it as an error —
  /// per spec.md §4.6, deletions are observed-only here.
  pub async fn index_one(&self, relative_path: &str, now_ms: i64) -> Result<Option<(IndexFileOutcome, String)>> {
    let absolute = self.root.join(relative_path);
    let metadata = match std::fs::metadata(&absolute) {
      Ok(m) => m,
      Err(_) => return Ok(None),
    };
    if !metadata.is_file() {
      return Ok(None);
    }

    let binary = is_binary_file(&absolute);
    if binary && !self.index_binaries {
      return Ok(Some((IndexFileOutcome::Skipped, String::new())));
    }

    let raw_bytes = std::fs::read(&absolute).unwrap_or_default();
    let text_content = if binary { None } else { std::str::from_utf8(&raw_bytes).ok().map(str::to_string) };
    let language = detect_language(&absolute);
    let extension = absolute.extension().and_then(|e| e.to_str()).unwrap_or("").to_string();
    let hints = match (&text_content, self.extract_enabled) {
      (Some(content), true) => extract_metadata(content, &language),
      _ => Default::default(),
    };
    let git_info = if self.track_git { git::lookup(&self.root) } else { Default::default() };

    let stat = FileStat {
      size_bytes: metadata.len(),
      last_modified: metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(now_ms),
    };

    let hash_input: &[u8] = text_content.as_deref().map(str::as_bytes).unwrap_or(&raw_bytes);
    let hash = rewindex_store::sha256_hex(hash_input);

    let outcome = self
      .store
      .upsert_file(
        self.project_id,
        relative_path,
        hash_input,
        text_content.as_deref(),
        stat,
        &language,
        &extension,
        hints,
        git_info,
        now_ms,
      )
      .await?;

    let outcome = match outcome {
      rewindex_store::UpsertOutcome::Added => IndexFileOutcome::Added,
      rewindex_store::UpsertOutcome::Updated => IndexFileOutcome::Updated,
      rewindex_store::UpsertOutcome::Unchanged => IndexFileOutcome::Unchanged,
    };
    Ok(Some((outcome, hash)))
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanCounts {
  pub added: usize,
  pub updated: usize,
  pub skipped: usize,
  pub unchanged: usize,
}

fn relative_posix_path(root: &Path, entry: &Path) -> Option<String> {
  let rel = entry.strip_prefix(root).ok()?;
  Some(rel.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect::<Vec<_>>().join("/"))
}

/// Walks `ctx.root`, indexes every eligible file, then reconciles deletes
/// and renames against the previously-current set (spec.md §4.6).
pub async fn full_scan(ctx: &IndexContext, now_ms: i64) -> Result<(ScanCounts, ReconcileOutcome)> {
  let mut counts = ScanCounts::default();
  let mut present_paths: HashSet<String> = HashSet::new();
  let mut hash_to_paths: HashMap<String, Vec<String>> = HashMap::new();

  for entry in WalkDir::new(&ctx.root).into_iter().filter_map(|e| e.ok()) {
    if !entry.file_type().is_file() {
      continue;
    }
    let Some(relative_path) = relative_posix_path(&ctx.root, entry.path()) else { continue };
    let size = entry.metadata().ok().map(|m| m.len());
    if !ctx.matcher.is_eligible(&relative_path, size) {
      continue;
    }

    present_paths.insert(relative_path.clone());

    match ctx.index_one(&relative_path, now_ms).await {
      Ok(Some((outcome, hash))) => {
        match outcome {
          IndexFileOutcome::Added => counts.added += 1,
          IndexFileOutcome::Updated => counts.updated += 1,
          IndexFileOutcome::Unchanged => counts.unchanged += 1,
          IndexFileOutcome::Skipped => counts.skipped += 1,
        }
        if !hash.is_empty() {
          hash_to_paths.entry(hash).or_default().push(relative_path);
        }
      }
      Ok(None) => {}
      Err(e) => {
        tracing::warn!(path = %relative_path, error = %e, "skipping file during full scan");
        counts.skipped += 1;
      }
    }
  }

  let reconcile_outcome = reconcile(&ctx.store, ctx.project_id, &present_paths, &hash_to_paths).await?;
  ctx.store.refresh_all().await?;

  Ok((counts, reconcile_outcome))
}

#[cfg(test)]
mod tests {
  use super::*;
  use rewindex_backend::ElasticsearchBackend;
  use rewindex_core::{Config, Project};

  fn noop_store() -> Arc<VersionStore> {
    // Never actually contacted in these tests (no network calls made).
    let backend: Arc<dyn rewindex_backend::SearchBackend> = Arc::new(ElasticsearchBackend::new("http://127.0.0.1:1"));
    Arc::new(VersionStore::new(backend, &Config::default()))
  }

  #[test]
  fn relative_posix_path_uses_forward_slashes() {
    let root = Path::new("/proj");
    let entry = Path::new("/proj/src/a.rs");
    assert_eq!(relative_posix_path(root, entry), Some("src/a.rs".to_string()));
  }

  #[tokio::test]
  async fn index_one_returns_none_for_missing_path() {
    let dir = tempfile::tempdir().unwrap();
    let project = Project::new(dir.path().to_path_buf(), "demo");
    let ctx = IndexContext::new(dir.path(), project.id, &Config::default(), noop_store());
    let result = ctx.index_one("does-not-exist.rs", 0).await.unwrap();
    assert!(result.is_none());
  }
}
