use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RewindexError, Result};

fn default_index_binaries() -> bool {
  false
}

fn default_true() -> bool {
  true
}

/// Built-in exclusion defaults, unioned with `.gitignore`/`.rewindexignore`.
/// Mirrors `original_source/rewindex/config.py::DEFAULT_IGNORE_PATTERNS`.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
  "*.min.js",
  "*.min.css",
  "node_modules/**",
  "venv/**",
  ".git/**",
  "*.pyc",
  "__pycache__/**",
  "dist/**",
  "build/**",
  "target/**",
  "*.lock",
  "*.log",
  "*.sqlite",
  "*.db",
  ".env*",
  "*.key",
  "*.pem",
  "*.cert",
  "*.png",
  "*.jpg",
  "*.jpeg",
  "*.gif",
  "*.bmp",
  "*.ico",
  "*.pdf",
  "*.zip",
  "*.tar",
  "*.gz",
  "*.bz2",
  "*.7z",
  "*.rar",
  "*.exe",
  "*.dll",
  "*.so",
  "*.dylib",
  "*.bin",
  "*.dat",
  "*.woff",
  "*.woff2",
  "*.ttf",
  "*.eot",
  "*.mp3",
  "*.mp4",
  "*.avi",
  "*.mov",
  "*.wav",
];

/// Binary-suffix patterns stripped from exclusions when `index_binaries` is set.
pub const BINARY_SUFFIX_PATTERNS: &[&str] = &[
  "*.png", "*.jpg", "*.jpeg", "*.gif", "*.bmp", "*.ico", "*.pdf", "*.zip", "*.tar", "*.gz",
  "*.bz2", "*.7z", "*.rar", "*.exe", "*.dll", "*.so", "*.dylib", "*.bin", "*.dat", "*.woff",
  "*.woff2", "*.ttf", "*.eot", "*.mp3", "*.mp4", "*.avi", "*.mov", "*.wav",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
  pub id: String,
  pub name: String,
}

impl Default for ProjectSection {
  fn default() -> Self {
    ProjectSection { id: String::new(), name: "project".to_string() }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticsearchSection {
  pub host: String,
  pub index_prefix: String,
}

impl Default for ElasticsearchSection {
  fn default() -> Self {
    ElasticsearchSection {
      host: "http://localhost:9200".to_string(),
      index_prefix: "rewindex_${project.id}".to_string(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSection {
  #[serde(default = "default_true")]
  pub enabled: bool,
  pub debounce_ms: u64,
  pub poll_interval_secs: u64,
  pub batch_size: usize,
}

impl Default for WatchSection {
  fn default() -> Self {
    WatchSection { enabled: true, debounce_ms: 500, poll_interval_secs: 2, batch_size: 50 }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractSection {
  pub functions: bool,
  pub classes: bool,
  pub imports: bool,
  pub todos: bool,
}

impl Default for ExtractSection {
  fn default() -> Self {
    ExtractSection { functions: true, classes: true, imports: true, todos: true }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingSection {
  pub include_patterns: Vec<String>,
  pub exclude_patterns: Vec<String>,
  pub max_file_size_mb: u64,
  pub max_index_size_gb: u64,
  #[serde(default = "default_index_binaries")]
  pub index_binaries: bool,
  pub parallel_workers: usize,
  pub watch: WatchSection,
  pub extract: ExtractSection,
}

impl Default for IndexingSection {
  fn default() -> Self {
    IndexingSection {
      include_patterns: Vec::new(),
      exclude_patterns: Vec::new(),
      max_file_size_mb: 10,
      max_index_size_gb: 5,
      index_binaries: false,
      parallel_workers: 4,
      watch: WatchSection::default(),
      extract: ExtractSection::default(),
    }
  }
}

impl IndexingSection {
  pub fn max_file_size_bytes(&self) -> u64 {
    self.max_file_size_mb * 1024 * 1024
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSection {
  pub default_limit: usize,
  pub default_context_lines: usize,
  pub default_highlight: bool,
  pub boost: std::collections::HashMap<String, f32>,
}

impl Default for SearchSection {
  fn default() -> Self {
    let mut boost = std::collections::HashMap::new();
    boost.insert("file_name".to_string(), 2.0);
    boost.insert("recent_files".to_string(), 1.5);
    SearchSection { default_limit: 20, default_context_lines: 3, default_highlight: true, boost }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VersioningSection {
  pub keep_all_versions: bool,
  pub cleanup_after_days: u32,
}

impl Default for VersioningSection {
  fn default() -> Self {
    VersioningSection { keep_all_versions: true, cleanup_after_days: 90 }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSection {
  pub log_level: String,
}

impl Default for MonitoringSection {
  fn default() -> Self {
    MonitoringSection { log_level: "info".to_string() }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  pub project: ProjectSection,
  pub elasticsearch: ElasticsearchSection,
  pub indexing: IndexingSection,
  pub search: SearchSection,
  pub versioning: VersioningSection,
  pub monitoring: MonitoringSection,
}

impl Config {
  /// Resolve the config for `project_root`, layering project-local config
  /// over the user config over built-in defaults, then merging ignore
  /// file patterns into `indexing.exclude_patterns`.
  pub fn load_for_project(project_root: &Path) -> Result<Self> {
    let mut cfg = Config::default();

    if let Some(user_path) = Self::user_config_path() {
      if let Ok(text) = std::fs::read_to_string(&user_path) {
        Self::merge_toml(&mut cfg, &text)?;
      }
    }

    let project_path = project_root.join(".rewindex").join("config.toml");
    if let Ok(text) = std::fs::read_to_string(&project_path) {
      Self::merge_toml(&mut cfg, &text)?;
    }

    if cfg.project.id.is_empty() {
      cfg.project.id = crate::domain::ProjectId::from_root(project_root).as_str();
    }
    if cfg.project.name.is_empty() || cfg.project.name == "project" {
      if let Some(name) = project_root.file_name().and_then(|n| n.to_str()) {
        cfg.project.name = name.to_string();
      }
    }

    cfg.merge_default_ignores();
    cfg.merge_gitignore(project_root)?;
    cfg.merge_rewindexignore(project_root)?;

    if cfg.indexing.index_binaries {
      cfg
        .indexing
        .exclude_patterns
        .retain(|p| !BINARY_SUFFIX_PATTERNS.contains(&p.as_str()));
    }

    Ok(cfg)
  }

  fn merge_toml(cfg: &mut Config, text: &str) -> Result<()> {
    // A layer that doesn't parse falls back to defaults silently; this is
    // configuration, not user-facing restore input, per spec.md §7's
    // `parse-error` propagation policy (tolerated during config load).
    match toml::from_str::<Config>(text) {
      Ok(layer) => {
        Self::overlay(cfg, layer);
        Ok(())
      }
      Err(e) => {
        tracing::warn!(error = %e, "ignoring unparseable config layer");
        Ok(())
      }
    }
  }

  fn overlay(base: &mut Config, layer: Config) {
    if !layer.project.id.is_empty() {
      base.project.id = layer.project.id;
    }
    if layer.project.name != "project" {
      base.project.name = layer.project.name;
    }
    base.elasticsearch = layer.elasticsearch;
    base.indexing = layer.indexing;
    base.search = layer.search;
    base.versioning = layer.versioning;
    base.monitoring = layer.monitoring;
  }

  fn merge_default_ignores(&mut self) {
    let existing: std::collections::HashSet<_> =
      self.indexing.exclude_patterns.iter().cloned().collect();
    for pat in DEFAULT_IGNORE_PATTERNS {
      if !existing.contains(*pat) {
        self.indexing.exclude_patterns.push((*pat).to_string());
      }
    }
  }

  fn merge_gitignore(&mut self, root: &Path) -> Result<()> {
    self.merge_ignore_file(&root.join(".gitignore"))
  }

  fn merge_rewindexignore(&mut self, root: &Path) -> Result<()> {
    self.merge_ignore_file(&root.join(".rewindexignore"))
  }

  fn merge_ignore_file(&mut self, path: &Path) -> Result<()> {
    if !path.exists() {
      return Ok(());
    }
    let text = std::fs::read_to_string(path).map_err(|e| RewindexError::io(path, e))?;
    let patterns = parse_ignore_patterns(&text);
    let existing: std::collections::HashSet<_> =
      self.indexing.exclude_patterns.iter().cloned().collect();
    for p in patterns {
      if !existing.contains(&p) {
        self.indexing.exclude_patterns.push(p);
      }
    }
    Ok(())
  }

  pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("REWINDEX_CONFIG_DIR") {
      return Some(PathBuf::from(dir).join("config.toml"));
    }
    dirs::config_dir().map(|d| d.join("rewindex").join("config.toml"))
  }

  pub fn resolved_index_prefix(&self) -> String {
    self
      .elasticsearch
      .index_prefix
      .replace("${project.id}", &self.project.id)
      .replace("${project.name}", &self.project.name)
  }

  pub fn files_index_name(&self) -> String {
    format!("{}_files", self.resolved_index_prefix())
  }

  pub fn versions_index_name(&self) -> String {
    format!("{}_versions", self.resolved_index_prefix())
  }
}

/// Parse `.gitignore`/`.rewindexignore` grammar per spec.md §4.1's
/// simplifications: comments/blank lines skipped, negation dropped,
/// trailing `/` becomes `/**`, patterns without `/` are left bare (the
/// path matcher applies the basename-match rule for those itself).
pub fn parse_ignore_patterns(text: &str) -> Vec<String> {
  let mut patterns = Vec::new();
  for line in text.lines() {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
      continue;
    }
    let mut pattern = line.to_string();
    if let Some(stripped) = pattern.strip_suffix('/') {
      pattern = format!("{stripped}/**");
    } else if let Some(stripped) = pattern.strip_prefix('/') {
      pattern = stripped.to_string();
    }
    patterns.push(pattern);
  }
  patterns
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_config_has_expected_defaults() {
    let cfg = Config::default();
    assert_eq!(cfg.indexing.max_file_size_mb, 10);
    assert_eq!(cfg.indexing.watch.debounce_ms, 500);
    assert!(cfg.indexing.extract.functions);
  }

  #[test]
  fn resolved_index_prefix_substitutes() {
    let mut cfg = Config::default();
    cfg.project.id = "abc".to_string();
    cfg.project.name = "myproj".to_string();
    cfg.elasticsearch.index_prefix = "x_${project.id}_${project.name}".to_string();
    assert_eq!(cfg.resolved_index_prefix(), "x_abc_myproj");
  }

  #[test]
  fn parse_ignore_patterns_strips_comments_and_negation() {
    let text = "# comment\n\nbuild/\n!keep.txt\nnode_modules\n/rooted\n";
    let patterns = parse_ignore_patterns(text);
    assert_eq!(patterns, vec!["build/**", "node_modules", "rooted"]);
  }

  #[test]
  fn load_for_project_merges_gitignore_and_defaults() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".gitignore"), "tmp/\n").unwrap();
    let cfg = Config::load_for_project(dir.path()).unwrap();
    assert!(cfg.indexing.exclude_patterns.contains(&"tmp/**".to_string()));
    assert!(cfg.indexing.exclude_patterns.contains(&"node_modules/**".to_string()));
    assert!(!cfg.project.id.is_empty());
  }
}
