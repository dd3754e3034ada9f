//! Path eligibility (spec component C1).
//!
//! A path is eligible iff no exclusion pattern matches, the include list is
//! empty or one include matches, and the file does not exceed the configured
//! size cap. Matching a single pattern is a triple check: full relative-path
//! glob match, a `**`-aware path-style match, and a basename-only match for
//! patterns without a `/` — this mirrors how `.gitignore` lines like
//! `node_modules` or `dist/**` behave without requiring canonicalization.

use globset::{Glob, GlobMatcher};
use rewindex_core::Config;

/// One compiled exclusion/inclusion pattern, matched three ways.
struct CompiledPattern {
  has_slash: bool,
  /// `*` may cross path separators (fnmatch-like full-path match).
  loose: GlobMatcher,
  /// `*` stops at separators, `**` crosses them (path-style match).
  strict: GlobMatcher,
  /// Only used when the source pattern has no `/`.
  basename_only: Option<GlobMatcher>,
}

impl CompiledPattern {
  fn compile(pattern: &str) -> Option<Self> {
    let has_slash = pattern.contains('/');
    let loose = Glob::new(pattern).ok()?.compile_matcher();
    let strict = globset::GlobBuilder::new(pattern)
      .literal_separator(true)
      .build()
      .ok()?
      .compile_matcher();
    let basename_only = if has_slash {
      None
    } else {
      Some(Glob::new(pattern).ok()?.compile_matcher())
    };
    Some(CompiledPattern { has_slash, loose, strict, basename_only })
  }

  fn matches(&self, relative_path: &str, basename: &str) -> bool {
    if self.loose.is_match(relative_path) || self.strict.is_match(relative_path) {
      return true;
    }
    if !self.has_slash {
      if let Some(b) = &self.basename_only {
        return b.is_match(basename);
      }
    }
    false
  }
}

pub struct Matcher {
  exclude: Vec<CompiledPattern>,
  include: Vec<CompiledPattern>,
  max_file_size_bytes: u64,
}

impl Matcher {
  pub fn from_config(config: &Config) -> Self {
    let exclude = config
      .indexing
      .exclude_patterns
      .iter()
      .filter_map(|p| CompiledPattern::compile(p))
      .collect();
    let include = config
      .indexing
      .include_patterns
      .iter()
      .filter_map(|p| CompiledPattern::compile(p))
      .collect();
    Matcher { exclude, include, max_file_size_bytes: config.indexing.max_file_size_bytes() }
  }

  /// `relative_path` must be POSIX-normalized (forward slashes) relative to
  /// the project root. `size_bytes` is the file's on-disk size, or `None`
  /// when the caller hasn't stat'd it (size is then not checked).
  pub fn is_eligible(&self, relative_path: &str, size_bytes: Option<u64>) -> bool {
    let basename = relative_path.rsplit('/').next().unwrap_or(relative_path);

    if self.exclude.iter().any(|p| p.matches(relative_path, basename)) {
      return false;
    }
    if !self.include.is_empty() && !self.include.iter().any(|p| p.matches(relative_path, basename)) {
      return false;
    }
    if let Some(size) = size_bytes {
      if size > self.max_file_size_bytes {
        return false;
      }
    }
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rewindex_core::Config;

  fn matcher_with_excludes(patterns: &[&str]) -> Matcher {
    let mut cfg = Config::default();
    cfg.indexing.exclude_patterns = patterns.iter().map(|s| s.to_string()).collect();
    Matcher::from_config(&cfg)
  }

  #[test]
  fn basename_pattern_matches_at_any_depth() {
    let m = matcher_with_excludes(&["node_modules"]);
    assert!(!m.is_eligible("node_modules/pkg/index.js", None));
    assert!(!m.is_eligible("a/b/node_modules/x.js", None));
    assert!(m.is_eligible("src/node_modules_helper.rs", None));
  }

  #[test]
  fn double_star_pattern_matches_subtree() {
    let m = matcher_with_excludes(&["dist/**"]);
    assert!(!m.is_eligible("dist/bundle.js", None));
    assert!(!m.is_eligible("dist/nested/deep/file.js", None));
    assert!(m.is_eligible("src/dist_notes.txt", None));
  }

  #[test]
  fn extension_pattern_matches_full_path() {
    let m = matcher_with_excludes(&["*.lock"]);
    assert!(!m.is_eligible("Cargo.lock", None));
    assert!(!m.is_eligible("nested/dir/yarn.lock", None));
    assert!(m.is_eligible("lockbox.rs", None));
  }

  #[test]
  fn size_cap_rejects_oversized_file() {
    let mut cfg = Config::default();
    cfg.indexing.max_file_size_mb = 1;
    let m = Matcher::from_config(&cfg);
    let cap = cfg.indexing.max_file_size_bytes();
    assert!(m.is_eligible("a.txt", Some(cap)));
    assert!(!m.is_eligible("a.txt", Some(cap + 1)));
  }

  #[test]
  fn include_list_restricts_when_non_empty() {
    let mut cfg = Config::default();
    cfg.indexing.include_patterns = vec!["*.rs".to_string()];
    let m = Matcher::from_config(&cfg);
    assert!(m.is_eligible("src/main.rs", None));
    assert!(!m.is_eligible("readme.md", None));
  }

  #[test]
  fn eligibility_is_idempotent() {
    let m = matcher_with_excludes(&["target/**"]);
    let a = m.is_eligible("target/debug/bin", None);
    let b = m.is_eligible("target/debug/bin", None);
    assert_eq!(a, b);
  }
}
