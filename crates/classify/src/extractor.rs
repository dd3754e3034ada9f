//! Metadata extraction (spec component C3).
//!
//! Best-effort, regex-driven, pure, side-effect-free. Grounded on the
//! original implementation's `extractor.py`: per-language rules for
//! Python, JavaScript/TypeScript, and Go, TODO extraction for every
//! language, and a final `has_tests` heuristic.

use std::sync::LazyLock;

use regex::Regex;
use rewindex_core::SymbolHints;

static TODO_PATTERN: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)\b(?:TODO|FIXME|HACK)\b[\s:.\-]*(.*)").unwrap());

static PY_IMPORT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?m)^(?:from|import)\s+([\w.]+)").unwrap());
static PY_DEF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^def\s+(\w+)").unwrap());
static PY_CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^class\s+(\w+)").unwrap());
static PY_TEST_DEF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^def\s+test_").unwrap());

static JS_IMPORT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"(?:import|require)\s*\(?["']([^"']+)"#).unwrap());
static JS_FUNC: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?:function\s+(\w+)|const\s+(\w+)\s*=.*=>)").unwrap());
static JS_CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"class\s+(\w+)").unwrap());
static JS_EXPORT: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"export\s+(?:default\s+)?(?:function|class|const)\s+(\w+)").unwrap()
});

static GO_IMPORT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"import\s+"([^"]+)""#).unwrap());
static GO_FUNC: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?m)^func\s+(?:\(\w+\s+\*?\w+\)\s+)?(\w+)").unwrap());
static GO_TYPE_STRUCT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?m)^type\s+(\w+)\s+struct").unwrap());

fn find_all(re: &Regex, content: &str) -> Vec<String> {
  re.captures_iter(content)
    .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
    .collect()
}

/// Never fails; unknown languages get TODO extraction only.
pub fn extract_metadata(content: &str, language: &str) -> SymbolHints {
  let mut hints = SymbolHints::default();
  let mut has_tests_lang_flag = false;

  match language {
    "python" => {
      hints.imports = find_all(&PY_IMPORT, content);
      hints.defined_functions = find_all(&PY_DEF, content);
      hints.defined_classes = find_all(&PY_CLASS, content);
      has_tests_lang_flag = PY_TEST_DEF.is_match(content);
    }
    "javascript" | "typescript" => {
      hints.imports = find_all(&JS_IMPORT, content);
      hints.defined_functions = JS_FUNC
        .captures_iter(content)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)).map(|m| m.as_str().to_string()))
        .collect();
      hints.defined_classes = find_all(&JS_CLASS, content);
      hints.exports = find_all(&JS_EXPORT, content);
    }
    "go" => {
      hints.imports = find_all(&GO_IMPORT, content);
      hints.defined_functions = find_all(&GO_FUNC, content);
      hints.defined_classes = find_all(&GO_TYPE_STRUCT, content);
    }
    _ => {}
  }

  hints.todos = TODO_PATTERN
    .captures_iter(content)
    .filter_map(|c| c.get(1).map(|m| m.as_str().trim().to_string()))
    .filter(|s| !s.is_empty())
    .collect();

  let lowered = content.to_lowercase();
  hints.has_tests = has_tests_lang_flag || lowered.contains("test") || lowered.contains("spec");

  hints
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn python_extraction() {
    let content = "import os\nfrom foo.bar import baz\n\ndef test_it():\n    pass\n\nclass Widget:\n    pass\n";
    let hints = extract_metadata(content, "python");
    assert_eq!(hints.imports, vec!["os", "foo.bar"]);
    assert_eq!(hints.defined_functions, vec!["test_it"]);
    assert_eq!(hints.defined_classes, vec!["Widget"]);
    assert!(hints.has_tests);
  }

  #[test]
  fn javascript_extraction() {
    let content = "import { x } from \"./x\";\nfunction foo() {}\nconst bar = () => {};\nexport default function Baz() {}\nclass Quux {}\n";
    let hints = extract_metadata(content, "javascript");
    assert_eq!(hints.imports, vec!["./x"]);
    assert!(hints.defined_functions.contains(&"foo".to_string()));
    assert!(hints.defined_functions.contains(&"bar".to_string()));
    assert_eq!(hints.defined_classes, vec!["Quux"]);
    assert_eq!(hints.exports, vec!["Baz"]);
  }

  #[test]
  fn go_extraction() {
    let content = "import \"fmt\"\n\ntype Server struct {}\n\nfunc (s *Server) Run() {}\n";
    let hints = extract_metadata(content, "go");
    assert_eq!(hints.imports, vec!["fmt"]);
    assert_eq!(hints.defined_classes, vec!["Server"]);
    assert_eq!(hints.defined_functions, vec!["Run"]);
  }

  #[test]
  fn todos_collected_case_insensitively() {
    let content = "// TODO: fix this\n// fixme - also this\nlet x = 1; // HACK something\n";
    let hints = extract_metadata(content, "plaintext");
    assert_eq!(hints.todos.len(), 3);
    assert_eq!(hints.todos[0], "fix this");
  }

  #[test]
  fn unknown_language_extracts_only_todos() {
    let content = "some random text\n# TODO finish\n";
    let hints = extract_metadata(content, "plaintext");
    assert!(hints.imports.is_empty());
    assert_eq!(hints.todos, vec!["finish"]);
  }

  #[test]
  fn has_tests_substring_heuristic() {
    let hints = extract_metadata("this module has a spec file", "plaintext");
    assert!(hints.has_tests);
    let hints2 = extract_metadata("nothing interesting here", "plaintext");
    assert!(!hints2.has_tests);
  }
}
