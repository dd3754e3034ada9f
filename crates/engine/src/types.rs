//! Facade-level response types for the Operations Surface (spec.md §6).

use rewindex_core::{FileRecord, VersionRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitProjectOutcome {
  pub project_id: String,
  pub project_name: String,
  pub files_index: String,
  pub versions_index: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FullScanOutcome {
  pub added: usize,
  pub updated: usize,
  pub skipped: usize,
  pub deleted: usize,
  pub renamed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
  pub backend_reachable: bool,
  pub files_doc_count: u64,
  pub versions_doc_count: u64,
  pub watcher_running: bool,
  /// Milliseconds since the watcher's last successful scan/event pass, or
  /// `None` if no watcher has run yet (or none has completed a pass).
  pub last_update_age_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSnapshot {
  pub relative_path: String,
  pub content_hash: String,
  pub language: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PurgeOutcome {
  pub files_removed: usize,
  pub versions_removed: u64,
  pub dry_run: bool,
}

pub type FileCurrentOutcome = Option<FileRecord>;
pub type VersionOutcome = Option<VersionRecord>;

/// Result of an as-of lookup: the version active at or before the
/// timestamp, or — per spec.md §6's fallback — the current record when no
/// version existed yet at that moment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum FileAtOutcome {
  AsOf(VersionRecord),
  CurrentFallback(FileRecord),
  Absent,
}
