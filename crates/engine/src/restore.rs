//! `restore` (spec.md §6): writes the bytes of a given revision back to
//! disk. Refuses to write outside the project root and, unless
//! `overwrite` is set, refuses to clobber an existing file.

use std::path::{Path, PathBuf};

use rewindex_core::{ProjectId, Result, RewindexError};

use rewindex_store::VersionStore;

pub async fn restore(
  store: &VersionStore,
  project_id: ProjectId,
  root: &Path,
  relative_path: &str,
  ts_ms: Option<i64>,
  output_path: Option<&Path>,
  overwrite: bool,
) -> Result<PathBuf> {
  let content = match ts_ms {
    Some(ts) => {
      store
        .at(project_id, relative_path, ts)
        .await?
        .map(|v| v.content)
        .or(match store.current(project_id, relative_path).await? {
          Some(record) => Some(record.content),
          None => None,
        })
    }
    None => store.current(project_id, relative_path).await?.map(|r| r.content),
  };

  let content = content.ok_or_else(|| RewindexError::NotFound(format!("no version of {relative_path} found at or before the requested time")))?;

  let destination = resolve_destination(root, relative_path, output_path)?;

  if destination.exists() && !overwrite {
    return Err(RewindexError::Conflict(format!("{} already exists", destination.display())));
  }

  if let Some(parent) = destination.parent() {
    std::fs::create_dir_all(parent).map_err(|e| RewindexError::io(parent, e))?;
  }
  std::fs::write(&destination, content).map_err(|e| RewindexError::io(&destination, e))?;

  Ok(destination)
}

fn resolve_destination(root: &Path, relative_path: &str, output_path: Option<&Path>) -> Result<PathBuf> {
  let target = match output_path {
    Some(p) => p.to_path_buf(),
    None => root.join(relative_path),
  };

  let root_canon = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
  let target_parent = target.parent().unwrap_or(&target);
  let parent_canon = target_parent.canonicalize().unwrap_or_else(|_| target_parent.to_path_buf());

  if output_path.is_some() && !parent_canon.starts_with(&root_canon) {
    return Err(RewindexError::InvalidArgument(format!("restore destination {} escapes project root", target.display())));
  }

  Ok(target)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn resolve_destination_defaults_under_root() {
    let root = Path::new("/proj");
    let dest = resolve_destination(root, "a/b.rs", None).unwrap();
    assert_eq!(dest, Path::new("/proj/a/b.rs"));
  }

  #[test]
  fn resolve_destination_rejects_escape_via_output_path() {
    let dir = tempfile::tempdir().unwrap();
    let outside = std::env::temp_dir().join("outside-rewindex-restore-test");
    let result = resolve_destination(dir.path(), "a.rs", Some(&outside));
    assert!(result.is_err());
  }
}
