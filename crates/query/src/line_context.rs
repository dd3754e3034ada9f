//! Pure line-anchor reconstruction for a single search hit. Grounded on
//! `original_source/rewindex/search.py::_compute_line_context`, reimplemented
//! as an independently testable function per spec.md §4.8/§9: no backend
//! access, no I/O — just content, a highlight fragment, and the query.

use std::sync::LazyLock;

use regex::Regex;

static MARK_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?mark>").unwrap());
static MARKED_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<mark>(.*?)</mark>").unwrap());
static WORD_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z0-9_]+").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineContext {
  pub line: u32,
  pub highlight: String,
  pub before: Vec<String>,
  pub after: Vec<String>,
}

/// Four-tier fallback cascade, in order:
/// 1. Token-coverage scoring against the highlight fragment's marked tokens.
/// 2. A direct case-insensitive substring match of the full query.
/// 3. Token-coverage scoring against the query's own tokens.
/// 4. The first occurrence of any single marked or query token.
///
/// Returns `None` only if every tier fails to locate a line (empty content,
/// or no token/substring match anywhere).
pub fn compute_line_context(content: &str, highlight_fragment: &str, query: &str, context_lines: usize, apply_markup: bool) -> Option<LineContext> {
  if content.is_empty() {
    return None;
  }
  let lines: Vec<&str> = content.lines().collect();

  let marked_tokens: Vec<String> = MARKED_TOKEN.captures_iter(highlight_fragment).filter_map(|c| c.get(1)).map(|m| m.as_str().to_string()).collect();

  if !marked_tokens.is_empty() {
    let lowered: Vec<String> = marked_tokens.iter().map(|t| t.to_lowercase()).collect();
    if let Some((idx, score)) = best_line_by_token_coverage(&lines, &lowered) {
      if score > 0 {
        return Some(build_context(&lines, idx, &lowered, context_lines, apply_markup));
      }
    }
  }

  let q_full = query.trim();
  if !q_full.is_empty() {
    if let Some(pos) = find_ci(content, q_full) {
      let line_no = content[..pos].matches('\n').count();
      if line_no < lines.len() {
        return Some(build_context(&lines, line_no, &[q_full.to_lowercase()], context_lines, apply_markup));
      }
    }
  }

  let q_tokens: Vec<String> = WORD_TOKEN.find_iter(query).map(|m| m.as_str().to_lowercase()).collect();
  if !q_tokens.is_empty() {
    if let Some((idx, score)) = best_line_by_token_coverage(&lines, &q_tokens) {
      if score > 0 {
        return Some(build_context(&lines, idx, &q_tokens, context_lines, apply_markup));
      }
    }
  }

  let frag_plain = MARK_TAG.replace_all(highlight_fragment, "").trim().to_string();
  let mut pos = if !frag_plain.is_empty() { content.find(&frag_plain) } else { None };

  let token = marked_tokens.first().cloned();
  if pos.is_none() {
    if let Some(t) = &token {
      pos = find_ci(content, t);
    }
  }
  if pos.is_none() {
    if let Some(t) = q_tokens.first().or_else(|| if query.is_empty() { None } else { None }) {
      pos = find_ci(content, t);
    } else if let Some(m) = WORD_TOKEN.find(query) {
      pos = find_ci(content, m.as_str());
    }
  }

  let pos = pos?;
  let line_no = content[..pos].matches('\n').count();
  if line_no >= lines.len() {
    return None;
  }
  let fallback_token = token.or_else(|| WORD_TOKEN.find(query).map(|m| m.as_str().to_string()));
  let tokens: Vec<String> = fallback_token.map(|t| vec![t.to_lowercase()]).unwrap_or_default();
  Some(build_context(&lines, line_no, &tokens, context_lines, apply_markup))
}

fn best_line_by_token_coverage(lines: &[&str], lowered_tokens: &[String]) -> Option<(usize, usize)> {
  let mut best: Option<(usize, usize)> = None;
  for (i, line) in lines.iter().enumerate() {
    let lower = line.to_lowercase();
    let score = lowered_tokens.iter().filter(|t| !t.is_empty() && lower.contains(t.as_str())).count();
    if best.is_none_or(|(_, best_score)| score > best_score) {
      best = Some((i, score));
    }
  }
  best
}

fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
  let haystack_lower = haystack.to_lowercase();
  let needle_lower = needle.to_lowercase();
  haystack_lower.find(&needle_lower)
}

fn build_context(lines: &[&str], idx: usize, lowered_tokens: &[String], context_lines: usize, apply_markup: bool) -> LineContext {
  let line_text = lines[idx];
  let highlight = if apply_markup { mark_tokens(line_text, lowered_tokens) } else { line_text.to_string() };

  let start = idx.saturating_sub(context_lines);
  let end = (idx + 1 + context_lines).min(lines.len());
  let before = lines[start..idx].iter().map(|s| s.to_string()).collect();
  let after = lines[(idx + 1)..end].iter().map(|s| s.to_string()).collect();

  LineContext { line: idx as u32 + 1, highlight, before, after }
}

/// Wraps every case-insensitive occurrence of each token in `<mark>`, longest
/// tokens first so a shorter token doesn't fragment a longer match.
fn mark_tokens(line: &str, lowered_tokens: &[String]) -> String {
  let mut tokens: Vec<&String> = lowered_tokens.iter().collect();
  tokens.sort_by_key(|t| std::cmp::Reverse(t.len()));
  tokens.dedup();

  let mut result = line.to_string();
  for token in tokens {
    if token.is_empty() {
      continue;
    }
    if let Ok(pattern) = Regex::new(&format!("(?i){}", regex::escape(token))) {
      result = pattern.replace_all(&result, |caps: &regex::Captures| format!("<mark>{}</mark>", &caps[0])).into_owned();
    }
  }
  result
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_content_yields_none() {
    assert!(compute_line_context("", "", "foo", 3, true).is_none());
  }

  #[test]
  fn marked_tokens_pick_highest_coverage_line() {
    let content = "alpha\nfoo bar\nbaz foo\n";
    let ctx = compute_line_context(content, "<mark>foo</mark> <mark>bar</mark>", "foo bar", 1, true).unwrap();
    assert_eq!(ctx.line, 2);
    assert!(ctx.highlight.contains("<mark>foo</mark>"));
    assert_eq!(ctx.before, vec!["alpha".to_string()]);
    assert_eq!(ctx.after, vec!["baz foo".to_string()]);
  }

  #[test]
  fn falls_back_to_direct_substring_match() {
    let content = "one\ntwo needle three\nfour\n";
    let ctx = compute_line_context(content, "", "needle", 0, true).unwrap();
    assert_eq!(ctx.line, 2);
    assert!(ctx.highlight.contains("<mark>needle</mark>"));
  }

  #[test]
  fn falls_back_to_token_coverage_when_no_exact_substring() {
    let content = "x\nalpha beta\ngamma\n";
    let ctx = compute_line_context(content, "", "beta gamma-delta", 0, true).unwrap();
    assert_eq!(ctx.line, 2);
  }

  #[test]
  fn no_match_anywhere_yields_none() {
    let content = "one\ntwo\nthree\n";
    assert!(compute_line_context(content, "", "zzz_not_present", 2, true).is_none());
  }

  #[test]
  fn context_lines_respect_bounds_at_file_edges() {
    let content = "needle\nb\nc\n";
    let ctx = compute_line_context(content, "", "needle", 5, true).unwrap();
    assert_eq!(ctx.line, 1);
    assert!(ctx.before.is_empty());
    assert_eq!(ctx.after, vec!["b".to_string(), "c".to_string()]);
  }
}
