use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace used to derive a stable project id from its root path.
/// Matches the original implementation's `uuid.uuid5(uuid.NAMESPACE_URL, ...)`.
const PROJECT_NAMESPACE: Uuid = Uuid::NAMESPACE_URL;

/// Stable identifier for a project, derived from the absolute POSIX path
/// of its root. The same root always yields the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
  pub fn from_root(root: &Path) -> Self {
    let abs = root
      .canonicalize()
      .unwrap_or_else(|_| root.to_path_buf());
    let posix = abs.to_string_lossy().replace('\\', "/");
    let name = format!("rewindex:{posix}");
    ProjectId(Uuid::new_v5(&PROJECT_NAMESPACE, name.as_bytes()))
  }

  pub fn as_str(&self) -> String {
    self.0.to_string()
  }
}

impl std::fmt::Display for ProjectId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// A rooted subtree on disk with a stable identifier and a human name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
  pub id: ProjectId,
  pub name: String,
  pub root: PathBuf,
}

impl Project {
  pub fn new(root: PathBuf, name: impl Into<String>) -> Self {
    let id = ProjectId::from_root(&root);
    Project { id, name: name.into(), root }
  }
}

/// Symbol hints extracted from a file's content by the metadata extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymbolHints {
  #[serde(default)]
  pub imports: Vec<String>,
  #[serde(default)]
  pub defined_functions: Vec<String>,
  #[serde(default)]
  pub defined_classes: Vec<String>,
  #[serde(default)]
  pub exports: Vec<String>,
  #[serde(default)]
  pub todos: Vec<String>,
  #[serde(default)]
  pub has_tests: bool,
}

/// Best-effort, never a hard failure: recovered from `git` when possible.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitProvenance {
  pub git_commit: Option<String>,
  pub git_branch: Option<String>,
  pub git_author: Option<String>,
}

/// Current view of one path within a project. Keyed by `(project_id, relative_path)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
  pub project_id: ProjectId,
  pub relative_path: String,
  pub content_hash: String,
  pub previous_hash: Option<String>,
  pub is_current: bool,
  pub deleted: bool,
  pub deleted_at: Option<i64>,
  pub renamed_from: Option<String>,
  pub renamed_to: Option<String>,
  pub language: String,
  pub extension: String,
  pub file_name: String,
  pub size_bytes: u64,
  pub line_count: u32,
  pub last_modified: i64,
  pub indexed_at: i64,
  #[serde(flatten)]
  pub hints: SymbolHints,
  #[serde(flatten)]
  pub git: GitProvenance,
  pub content: String,
}

impl FileRecord {
  /// Document id in the current-files index: `"${project_id}:${relative_path}"`.
  pub fn doc_id(project_id: ProjectId, relative_path: &str) -> String {
    format!("{project_id}:{relative_path}")
  }
}

/// One per distinct `(path, content_hash)` pair ever observed, keyed by
/// `content_hash` alone (global content addressing).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
  pub file_path: String,
  pub content_hash: String,
  pub previous_hash: Option<String>,
  pub created_at: i64,
  pub is_current: bool,
  pub content: String,
  pub language: String,
  pub project_id: ProjectId,
}

/// `line_count = (count of '\n' in content) + 1`.
pub fn line_count(content: &str) -> u32 {
  content.bytes().filter(|&b| b == b'\n').count() as u32 + 1
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::str::FromStr;

  #[test]
  fn project_id_stable_for_same_root() {
    let dir = tempfile::tempdir().unwrap();
    let a = ProjectId::from_root(dir.path());
    let b = ProjectId::from_root(dir.path());
    assert_eq!(a, b);
  }

  #[test]
  fn project_id_differs_for_different_roots() {
    let a_dir = tempfile::tempdir().unwrap();
    let b_dir = tempfile::tempdir().unwrap();
    assert_ne!(ProjectId::from_root(a_dir.path()), ProjectId::from_root(b_dir.path()));
  }

  #[test]
  fn project_id_matches_uuid5_construction() {
    let dir = tempfile::tempdir().unwrap();
    let canon = dir.path().canonicalize().unwrap();
    let posix = canon.to_string_lossy().replace('\\', "/");
    let expected = Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("rewindex:{posix}").as_bytes());
    assert_eq!(ProjectId::from_root(dir.path()).0, expected);
  }

  #[test]
  fn line_count_basic() {
    assert_eq!(line_count("print(1)\n"), 2);
    assert_eq!(line_count(""), 1);
    assert_eq!(line_count("a\nb\nc"), 3);
  }

  #[test]
  fn project_id_parses_as_uuid() {
    let dir = tempfile::tempdir().unwrap();
    let id = ProjectId::from_root(dir.path());
    assert!(Uuid::from_str(&id.as_str()).is_ok());
  }
}
