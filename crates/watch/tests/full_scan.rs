//! End-to-end scenarios for `full_scan` (spec.md §8), exercised against a
//! real temp directory and an in-memory backend rather than a live
//! Elasticsearch instance.

use std::sync::Arc;

use rewindex_core::{Config, Project};
use rewindex_store::{MemoryBackend, VersionStore};
use rewindex_watch::{IndexContext, full_scan};

fn ctx_for(dir: &std::path::Path) -> (IndexContext, Project) {
  let config = Config::default();
  let project = Project::new(dir.to_path_buf(), "demo");
  let backend: Arc<dyn rewindex_backend::SearchBackend> = Arc::new(MemoryBackend::default());
  let store = Arc::new(VersionStore::new(backend, &config));
  let ctx = IndexContext::new(dir.to_path_buf(), project.id, &config, store);
  (ctx, project)
}

#[tokio::test]
async fn first_index_creates_one_current_file_and_one_version() {
  let dir = tempfile::tempdir().unwrap();
  std::fs::write(dir.path().join("a.py"), "print(1)\n").unwrap();
  let (ctx, project) = ctx_for(dir.path());

  let (counts, reconcile) = full_scan(&ctx, 1000).await.unwrap();
  assert_eq!(counts.added, 1);
  assert_eq!(reconcile.deleted, 0);

  let record = ctx.store.current(project.id, "a.py").await.unwrap().unwrap();
  assert!(record.is_current);
  assert_eq!(record.line_count, 2);
  let history = ctx.store.history(project.id, "a.py", 10).await.unwrap();
  assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn content_edit_then_revert_keeps_exactly_two_versions() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("a.py");
  std::fs::write(&path, "print(1)\n").unwrap();
  let (ctx, project) = ctx_for(dir.path());

  full_scan(&ctx, 1).await.unwrap();
  std::fs::write(&path, "print(2)\n").unwrap();
  full_scan(&ctx, 2).await.unwrap();
  std::fs::write(&path, "print(1)\n").unwrap();
  full_scan(&ctx, 3).await.unwrap();

  let history = ctx.store.history(project.id, "a.py", 10).await.unwrap();
  assert_eq!(history.len(), 2);
  let current = ctx.store.current(project.id, "a.py").await.unwrap().unwrap();
  assert_eq!(current.content, "print(1)\n");
}

#[tokio::test]
async fn oscillating_content_never_exceeds_two_version_records() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("a.py");
  let (ctx, project) = ctx_for(dir.path());

  for i in 0..6 {
    let content = if i % 2 == 0 { "X\n" } else { "Y\n" };
    std::fs::write(&path, content).unwrap();
    full_scan(&ctx, i as i64).await.unwrap();
  }

  let history = ctx.store.history(project.id, "a.py", 100).await.unwrap();
  assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn delete_then_scan_marks_file_deleted_without_touching_versions() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("a.py");
  std::fs::write(&path, "print(1)\n").unwrap();
  let (ctx, project) = ctx_for(dir.path());

  full_scan(&ctx, 1).await.unwrap();
  std::fs::remove_file(&path).unwrap();
  let (_, reconcile) = full_scan(&ctx, 2).await.unwrap();

  assert_eq!(reconcile.deleted, 1);
  let record = ctx.store.current(project.id, "a.py").await.unwrap().unwrap();
  assert!(record.deleted);
  assert!(!record.is_current);
  let history = ctx.store.history(project.id, "a.py", 10).await.unwrap();
  assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn rename_detected_across_two_scans() {
  let dir = tempfile::tempdir().unwrap();
  std::fs::create_dir_all(dir.path().join("src")).unwrap();
  let old_path = dir.path().join("src/a.py");
  std::fs::write(&old_path, "X\n").unwrap();
  let (ctx, project) = ctx_for(dir.path());

  full_scan(&ctx, 1).await.unwrap();
  std::fs::rename(&old_path, dir.path().join("src/b.py")).unwrap();
  let (_, reconcile) = full_scan(&ctx, 2).await.unwrap();

  assert_eq!(reconcile.renamed, 1);
  let old_record = ctx.store.current(project.id, "src/a.py").await.unwrap().unwrap();
  assert_eq!(old_record.renamed_to.as_deref(), Some("src/b.py"));
  let new_record = ctx.store.current(project.id, "src/b.py").await.unwrap().unwrap();
  assert_eq!(new_record.renamed_from.as_deref(), Some("src/a.py"));

  let history = ctx.store.history(project.id, "src/b.py", 10).await.unwrap();
  assert_eq!(history.len(), 1);
}
