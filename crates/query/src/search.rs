//! Query routing and result assembly (spec.md §4.8). Grounded on
//! `original_source/rewindex/search.py::simple_search_es` for the query-DSL
//! shape, index routing, and per-hit assembly loop; uses
//! [`crate::line_context::compute_line_context`] for the line anchor instead
//! of the original's inline cascade.

use std::collections::HashMap;

use rewindex_backend::SearchBackend;
use rewindex_core::{Result, RewindexError};
use serde_json::{Value, json};

use crate::line_context::compute_line_context;
use crate::types::{MatchContext, MatchSpan, ResultMetadata, SearchFilters, SearchHitResult, SearchOptions, SearchOutcome};

const MAX_MATCHES_PER_FILE: usize = 10;

/// Picks the index to query and whether the as-of date field is
/// `created_at` (versions) or `last_modified` (current files).
fn route(filters: &SearchFilters, options: &SearchOptions, files_index: &str, versions_index: &str) -> (&'static str, String) {
  let use_versions = filters.created_before_ms.is_some() || options.show_deleted;
  if use_versions {
    ("created_at", versions_index.to_string())
  } else {
    ("last_modified", files_index.to_string())
  }
}

fn build_query(query: &str, filters: &SearchFilters, options: &SearchOptions, date_field: &str, index: &str, boost: &HashMap<String, f32>) -> Result<Value> {
  let mut must: Vec<Value> = Vec::new();
  let trimmed = query.trim();
  if !trimmed.is_empty() && trimmed != "*" {
    let content_boost = boost.get("content").copied().unwrap_or(1.0);
    let file_name_boost = boost.get("file_name").copied().unwrap_or(2.0);
    must.push(json!({
      "multi_match": {
        "query": query,
        "operator": "and",
        "fields": [format!("content^{content_boost}"), format!("file_name.text^{file_name_boost}")],
        "fuzziness": options.fuzziness,
      }
    }));
  }

  let mut filter_clauses: Vec<Value> = Vec::new();
  if index.ends_with("_files") {
    if let Some(is_current) = filters.is_current {
      filter_clauses.push(json!({ "term": { "is_current": is_current } }));
    } else if !options.show_deleted {
      filter_clauses.push(json!({ "term": { "is_current": true } }));
    }
  }
  if let Some(langs) = &filters.language {
    filter_clauses.push(json!({ "terms": { "language": langs } }));
  }
  if let Some(types) = &filters.file_types {
    filter_clauses.push(json!({ "terms": { "extension": types } }));
  }
  if let Some(pattern) = &filters.path_pattern {
    let normalized = pattern.replace("**", "*");
    filter_clauses.push(json!({ "wildcard": { "relative_path": normalized } }));
  }
  if let Some(prefix) = &filters.path_prefix {
    filter_clauses.push(json!({ "prefix": { "relative_path": prefix } }));
  }
  if let Some(func) = &filters.has_function {
    filter_clauses.push(json!({ "term": { "defined_functions": func } }));
  }
  if let Some(class) = &filters.has_class {
    filter_clauses.push(json!({ "term": { "defined_classes": class } }));
  }
  if let Some(paths) = &filters.file_paths {
    filter_clauses.push(json!({ "terms": { "relative_path": paths } }));
  }
  if let Some(cutoff) = filters.created_before_ms {
    filter_clauses.push(json!({ "range": { date_field: { "lte": cutoff } } }));
  }

  let mut body = json!({
    "query": {
      "bool": {
        "must": if must.is_empty() { vec![json!({"match_all": {}})] } else { must },
        "filter": filter_clauses,
      }
    },
    "size": options.limit.max(1),
  });

  if options.highlight {
    body["highlight"] = json!({
      "pre_tags": ["<mark>"],
      "post_tags": ["</mark>"],
      "fields": {
        "content": {
          "type": "unified",
          "number_of_fragments": 10,
          "fragment_size": (options.context_lines * 120).max(120),
        }
      }
    });
  }

  Ok(body)
}

pub async fn search(
  backend: &dyn SearchBackend,
  files_index: &str,
  versions_index: &str,
  query: &str,
  filters: &SearchFilters,
  options: &SearchOptions,
  boost: &HashMap<String, f32>,
) -> Result<SearchOutcome> {
  let (date_field, index) = route(filters, options, files_index, versions_index);
  if query.len() > 10_000 {
    return Err(RewindexError::InvalidArgument("query exceeds maximum length".to_string()));
  }

  let body = build_query(query, filters, options, date_field, &index, boost)?;
  let response = backend.search(&index, body).await?;

  let mut results = Vec::with_capacity(response.hits.len());
  for hit in response.hits {
    match assemble_hit(&hit.source, hit.score, &hit.highlight, query, options) {
      Some(result) => results.push(result),
      None => tracing::warn!(index = %index, "skipping hit with unassemblable source document"),
    }
  }

  Ok(SearchOutcome { total_hits: results.len(), results })
}

fn assemble_hit(source: &Value, score: f32, highlight: &std::collections::HashMap<String, Vec<String>>, query: &str, options: &SearchOptions) -> Option<SearchHitResult> {
  let file_path = source.get("relative_path").or_else(|| source.get("file_path"))?.as_str()?.to_string();
  let language = source.get("language").and_then(|v| v.as_str()).unwrap_or("plaintext").to_string();
  let content = source.get("content").and_then(|v| v.as_str()).unwrap_or("");

  let fragments = highlight.get("content").cloned().unwrap_or_default();
  let mut matches = Vec::new();
  let mut used_lines = std::collections::HashSet::new();

  for frag in fragments.iter().take(MAX_MATCHES_PER_FILE) {
    if let Some(ctx) = compute_line_context(content, frag, query, options.context_lines, options.highlight) {
      if used_lines.insert(ctx.line) {
        matches.push(MatchSpan { line: ctx.line, highlight: ctx.highlight, context: MatchContext { before: ctx.before, after: ctx.after } });
      }
    }
  }

  if matches.is_empty() {
    if let Some(ctx) = compute_line_context(content, "", query, options.context_lines, options.highlight) {
      matches.push(MatchSpan { line: ctx.line, highlight: ctx.highlight, context: MatchContext { before: ctx.before, after: ctx.after } });
    }
  }

  let metadata = ResultMetadata {
    size_bytes: source.get("size_bytes").and_then(|v| v.as_u64()).unwrap_or(0),
    functions: string_array(source.get("defined_functions")),
    classes: string_array(source.get("defined_classes")),
    imports: string_array(source.get("imports")),
  };

  Some(SearchHitResult { file_path, score, language, matches, metadata })
}

fn string_array(value: Option<&Value>) -> Vec<String> {
  value
    .and_then(|v| v.as_array())
    .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
    .unwrap_or_default()
}
