//! Language detection (spec component C2, language half).
//!
//! The extension map and fallback order follow the original
//! implementation's `language.py` exactly, including the Monaco-editor
//! influenced `.toml` -> `"ini"` default and its override for
//! `Cargo.toml`/`pyproject.toml` -> `"toml"`.

use std::path::Path;

fn extension_language(ext: &str) -> Option<&'static str> {
  let lang = match ext {
    "html" | "htm" | "xhtml" => "html",
    "css" => "css",
    "scss" => "scss",
    "sass" => "sass",
    "less" => "less",
    "js" | "jsx" | "mjs" | "cjs" => "javascript",
    "ts" | "tsx" => "typescript",
    "vue" => "html",
    "svelte" => "html",

    "xml" | "svg" => "xml",
    "json" | "jsonc" | "json5" => "json",
    "yml" | "yaml" => "yaml",
    "toml" => "ini",
    "ini" | "cfg" | "conf" => "ini",
    "md" | "markdown" => "markdown",
    "rst" => "restructuredtext",
    "tex" => "latex",

    "c" | "h" => "c",
    "cpp" | "cc" | "cxx" | "hpp" | "hxx" => "cpp",
    "rs" => "rust",
    "go" => "go",

    "py" | "pyw" | "pyi" => "python",
    "java" => "java",
    "kt" | "kts" => "kotlin",
    "scala" => "scala",
    "cs" => "csharp",
    "fs" | "fsx" => "fsharp",
    "vb" => "vb",
    "swift" => "swift",
    "m" => "objective-c",
    "mm" => "objective-cpp",

    "rb" | "erb" => "ruby",
    "php" | "php3" | "php4" | "php5" | "phtml" => "php",
    "pl" | "pm" => "perl",
    "lua" => "lua",
    "r" => "r",

    "sh" | "bash" | "zsh" | "fish" => "shell",
    "bat" | "cmd" => "bat",
    "ps1" => "powershell",

    "sql" => "sql",
    "mysql" => "mysql",
    "pgsql" => "pgsql",

    "dockerfile" => "dockerfile",
    "graphql" | "gql" => "graphql",
    "proto" => "protobuf",
    "dart" => "dart",
    "clj" | "cljs" | "edn" => "clojure",
    "ex" | "exs" => "elixir",
    "erl" | "hrl" => "erlang",
    "hs" => "haskell",
    "ml" | "mli" => "ocaml",
    _ => return None,
  };
  Some(lang)
}

/// Detect a language tag from a path. Does not read the file except for the
/// shebang fallback, which reads only the first line.
pub fn detect_language(path: &Path) -> String {
  let ext = path
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| e.to_ascii_lowercase());
  let filename = path
    .file_name()
    .and_then(|n| n.to_str())
    .map(|n| n.to_ascii_lowercase())
    .unwrap_or_default();

  if let Some(ext) = &ext {
    if let Some(lang) = extension_language(ext) {
      return lang.to_string();
    }
  }

  if filename == "dockerfile" || filename.starts_with("dockerfile.") {
    return "dockerfile".to_string();
  }
  if filename == "makefile" || filename.starts_with("makefile.") {
    return "makefile".to_string();
  }
  if filename == ".gitignore" || filename == ".dockerignore" {
    return "ignore".to_string();
  }
  if filename == ".env" || filename.starts_with(".env.") {
    return "properties".to_string();
  }
  if matches!(filename.as_str(), ".editorconfig" | ".prettierrc" | ".eslintrc") {
    return "ini".to_string();
  }
  if matches!(filename.as_str(), "cargo.toml" | "pyproject.toml") {
    return "toml".to_string();
  }

  if let Ok(text) = std::fs::read_to_string(path) {
    if let Some(first_line) = text.lines().next() {
      if let Some(lang) = shebang_language(first_line) {
        return lang.to_string();
      }
    }
  }

  "plaintext".to_string()
}

fn shebang_language(first_line: &str) -> Option<&'static str> {
  if !first_line.starts_with("#!") {
    return None;
  }
  if first_line.contains("python") {
    Some("python")
  } else if first_line.contains("node") || first_line.contains("javascript") {
    Some("javascript")
  } else if first_line.contains("bash") || first_line.contains("sh") {
    Some("shell")
  } else if first_line.contains("ruby") {
    Some("ruby")
  } else if first_line.contains("perl") {
    Some("perl")
  } else {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::path::PathBuf;

  #[test]
  fn extension_map_basic_entries() {
    assert_eq!(detect_language(&PathBuf::from("a.rs")), "rust");
    assert_eq!(detect_language(&PathBuf::from("a.py")), "python");
    assert_eq!(detect_language(&PathBuf::from("a.ts")), "typescript");
  }

  #[test]
  fn toml_defaults_to_ini_but_special_basenames_override() {
    assert_eq!(detect_language(&PathBuf::from("rewindex.toml")), "ini");
    assert_eq!(detect_language(&PathBuf::from("Cargo.toml")), "toml");
    assert_eq!(detect_language(&PathBuf::from("pyproject.toml")), "toml");
  }

  #[test]
  fn special_basenames_without_extension() {
    assert_eq!(detect_language(&PathBuf::from("Dockerfile")), "dockerfile");
    assert_eq!(detect_language(&PathBuf::from("Dockerfile.prod")), "dockerfile");
    assert_eq!(detect_language(&PathBuf::from("Makefile")), "makefile");
  }

  #[test]
  fn shebang_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("script");
    std::fs::write(&path, "#!/usr/bin/env python3\nprint(1)\n").unwrap();
    assert_eq!(detect_language(&path), "python");
  }

  #[test]
  fn unknown_extension_falls_back_to_plaintext() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.xyz123");
    std::fs::write(&path, "hello").unwrap();
    assert_eq!(detect_language(&path), "plaintext");
  }
}
