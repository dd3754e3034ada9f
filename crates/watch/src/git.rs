//! Best-effort git provenance lookup (`SPEC_FULL.md` §3 supplement).
//! Never a hard error: any failure (not a repo, `git` missing, non-UTF8
//! output) yields an all-`None` `GitProvenance`.

use std::path::Path;
use std::process::Command;

use rewindex_core::GitProvenance;

pub fn lookup(root: &Path) -> GitProvenance {
  GitProvenance {
    git_commit: run(root, &["rev-parse", "HEAD"]),
    git_branch: run(root, &["rev-parse", "--abbrev-ref", "HEAD"]),
    git_author: run(root, &["log", "-1", "--pretty=format:%an"]),
  }
}

fn run(root: &Path, args: &[&str]) -> Option<String> {
  let output = Command::new("git").arg("-C").arg(root).args(args).output().ok()?;
  if !output.status.success() {
    return None;
  }
  let text = String::from_utf8(output.stdout).ok()?;
  let trimmed = text.trim();
  if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn non_repo_yields_all_none() {
    let dir = tempfile::tempdir().unwrap();
    let provenance = lookup(dir.path());
    assert!(provenance.git_commit.is_none());
    assert!(provenance.git_branch.is_none());
    assert!(provenance.git_author.is_none());
  }
}
