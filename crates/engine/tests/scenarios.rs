//! End-to-end Operations Surface scenarios (spec.md §8), exercised through
//! `Engine` against an in-memory backend rather than a live Elasticsearch
//! instance.

use std::sync::Arc;

use rewindex_core::Config;
use rewindex_engine::{Engine, FileAtOutcome};
use rewindex_query::{SearchFilters, SearchOptions};
use rewindex_store::MemoryBackend;

fn engine_for(dir: &std::path::Path, config: Config) -> Engine {
  let backend: Arc<dyn rewindex_backend::SearchBackend> = Arc::new(MemoryBackend::default());
  Engine::with_backend(dir.to_path_buf(), config, backend)
}

#[tokio::test]
async fn as_of_query_returns_the_version_active_at_the_requested_time() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("a.py");
  std::fs::write(&path, "print(1)\n").unwrap();
  let engine = engine_for(dir.path(), Config::default());

  engine.full_scan(1_000).await.unwrap();
  std::fs::write(&path, "print(2)\n").unwrap();
  engine.full_scan(2_000).await.unwrap();

  match engine.file_at("a.py", 1_500).await.unwrap() {
    FileAtOutcome::AsOf(version) => assert_eq!(version.content, "print(1)\n"),
    other => panic!("expected AsOf, got {other:?}"),
  }

  match engine.file_at("a.py", 2_500).await.unwrap() {
    FileAtOutcome::AsOf(version) => assert_eq!(version.content, "print(2)\n"),
    other => panic!("expected AsOf, got {other:?}"),
  }
}

#[tokio::test]
async fn files_at_excludes_paths_deleted_at_or_before_the_requested_time() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("a.py");
  std::fs::write(&path, "print(1)\n").unwrap();
  let engine = engine_for(dir.path(), Config::default());

  engine.full_scan(1_000).await.unwrap();
  std::fs::remove_file(&path).unwrap();
  engine.full_scan(2_000).await.unwrap();

  let before_delete = engine.files_at(1_500).await.unwrap();
  assert!(before_delete.iter().any(|s| s.relative_path == "a.py"));

  let after_delete = engine.files_at(2_500).await.unwrap();
  assert!(!after_delete.iter().any(|s| s.relative_path == "a.py"));
}

#[tokio::test]
async fn restore_round_trip_writes_back_the_exact_bytes_of_the_requested_version() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("a.py");
  std::fs::write(&path, "print(1)\n").unwrap();
  let engine = engine_for(dir.path(), Config::default());
  engine.full_scan(1_000).await.unwrap();

  std::fs::write(&path, "print(2)\n").unwrap();
  engine.full_scan(2_000).await.unwrap();

  let out_path = dir.path().join("restored.py");
  let destination = engine.restore("a.py", Some(1_500), Some(&out_path), false).await.unwrap();
  assert_eq!(destination, out_path);
  let restored = std::fs::read_to_string(&out_path).unwrap();
  assert_eq!(restored, "print(1)\n");
}

#[tokio::test]
async fn restore_refuses_to_overwrite_an_existing_file_unless_asked() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("a.py");
  std::fs::write(&path, "print(1)\n").unwrap();
  let engine = engine_for(dir.path(), Config::default());
  engine.full_scan(1_000).await.unwrap();

  let out_path = dir.path().join("restored.py");
  std::fs::write(&out_path, "existing\n").unwrap();

  let err = engine.restore("a.py", None, Some(&out_path), false).await;
  assert!(err.is_err());

  engine.restore("a.py", None, Some(&out_path), true).await.unwrap();
  assert_eq!(std::fs::read_to_string(&out_path).unwrap(), "print(1)\n");
}

#[tokio::test]
async fn purge_ignored_removes_files_whose_patterns_were_added_after_indexing() {
  let dir = tempfile::tempdir().unwrap();
  std::fs::create_dir_all(dir.path().join("vendor")).unwrap();
  std::fs::write(dir.path().join("vendor/lib.py"), "x = 1\n").unwrap();
  std::fs::write(dir.path().join("a.py"), "y = 1\n").unwrap();

  let mut config = Config::default();
  let engine = engine_for(dir.path(), config.clone());
  engine.full_scan(1_000).await.unwrap();

  config.indexing.exclude_patterns.push("vendor/**".to_string());
  let engine_with_ignore = engine_for(dir.path(), config);

  let dry_run = engine_with_ignore.purge_ignored(true).await.unwrap();
  assert_eq!(dry_run.files_removed, 1);
  assert_eq!(dry_run.versions_removed, 0);

  let outcome = engine_with_ignore.purge_ignored(false).await.unwrap();
  assert_eq!(outcome.files_removed, 1);
  assert_eq!(outcome.versions_removed, 1);

  assert!(engine_with_ignore.file_current("vendor/lib.py").await.unwrap().is_none());
  assert!(engine_with_ignore.file_current("a.py").await.unwrap().is_some());
}

#[tokio::test]
async fn search_against_an_empty_index_returns_zero_hits_not_an_error() {
  let dir = tempfile::tempdir().unwrap();
  let engine = engine_for(dir.path(), Config::default());

  let outcome = engine.search("the a of", &SearchFilters::default(), &SearchOptions::default()).await.unwrap();
  assert_eq!(outcome.total_hits, 0);
  assert!(outcome.results.is_empty());
}

#[tokio::test]
async fn search_finds_indexed_content_after_a_full_scan() {
  let dir = tempfile::tempdir().unwrap();
  std::fs::write(dir.path().join("a.py"), "def handle_request():\n    pass\n").unwrap();
  let engine = engine_for(dir.path(), Config::default());
  engine.full_scan(1_000).await.unwrap();

  let outcome = engine.search("handle_request", &SearchFilters::default(), &SearchOptions::default()).await.unwrap();
  assert_eq!(outcome.total_hits, 1);
  assert_eq!(outcome.results[0].file_path, "a.py");
}
