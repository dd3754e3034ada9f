//! Index schemas for the current-files and versions indices, grounded on
//! `es_schema.py`. Both share the same analysis settings: a
//! `word_delimiter_graph` filter that splits CamelCase and digit
//! boundaries while preserving the original token, lowercasing, and a
//! tiny English stopword list, applied identically at index and search
//! time so the same analyzer retrieves compound and component tokens.

use serde_json::{Value, json};

fn analysis_settings() -> Value {
  json!({
    "analysis": {
      "analyzer": {
        "code_index_analyzer": {
          "type": "custom",
          "tokenizer": "standard",
          "filter": ["lowercase", "word_parts", "code_stop"]
        },
        "code_search_analyzer": {
          "type": "custom",
          "tokenizer": "standard",
          "filter": ["lowercase", "word_parts", "code_stop"]
        }
      },
      "filter": {
        "word_parts": {
          "type": "word_delimiter_graph",
          "generate_word_parts": true,
          "generate_number_parts": true,
          "split_on_numerics": true,
          "split_on_case_change": true,
          "preserve_original": true,
          "catenate_words": false,
          "catenate_numbers": false,
          "catenate_all": false,
          "stem_english_possessive": false
        },
        "code_stop": {
          "type": "stop",
          "stopwords": ["the", "and", "or", "if", "then", "else"]
        }
      }
    }
  })
}

/// Schema body for the current-files index (`{prefix}_files`).
pub fn files_index_body() -> Value {
  json!({
    "settings": analysis_settings(),
    "mappings": {
      "properties": {
        "content": {
          "type": "text",
          "analyzer": "code_index_analyzer",
          "search_analyzer": "code_search_analyzer",
          "term_vector": "with_positions_offsets",
          "fields": { "keyword": { "type": "keyword", "ignore_above": 256 } }
        },
        "relative_path": { "type": "keyword" },
        "file_name": {
          "type": "keyword",
          "fields": {
            "text": {
              "type": "text",
              "analyzer": "code_index_analyzer",
              "search_analyzer": "code_search_analyzer"
            }
          }
        },
        "extension": { "type": "keyword" },
        "language": { "type": "keyword" },
        "size_bytes": { "type": "long" },
        "line_count": { "type": "integer" },
        "last_modified": { "type": "date" },
        "indexed_at": { "type": "date" },
        "content_hash": { "type": "keyword" },
        "previous_hash": { "type": "keyword" },
        "is_current": { "type": "boolean" },
        "deleted": { "type": "boolean" },
        "deleted_at": { "type": "date" },
        "renamed_from": { "type": "keyword" },
        "renamed_to": { "type": "keyword" },
        "imports": { "type": "keyword" },
        "exports": { "type": "keyword" },
        "defined_functions": { "type": "keyword" },
        "defined_classes": { "type": "keyword" },
        "todos": { "type": "text" },
        "has_tests": { "type": "boolean" },
        "git_commit": { "type": "keyword" },
        "git_branch": { "type": "keyword" },
        "git_author": { "type": "keyword" },
        "project_id": { "type": "keyword" }
      }
    }
  })
}

/// Schema body for the historical-versions index (`{prefix}_versions`).
pub fn versions_index_body() -> Value {
  json!({
    "settings": analysis_settings(),
    "mappings": {
      "properties": {
        "file_path": { "type": "keyword" },
        "content_hash": { "type": "keyword" },
        "previous_hash": { "type": "keyword" },
        "created_at": { "type": "date" },
        "is_current": { "type": "boolean" },
        "content": {
          "type": "text",
          "analyzer": "code_index_analyzer",
          "search_analyzer": "code_search_analyzer",
          "term_vector": "with_positions_offsets"
        },
        "language": { "type": "keyword" },
        "project_id": { "type": "keyword" }
      }
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn files_and_versions_share_analysis_settings() {
    assert_eq!(
      files_index_body()["settings"],
      versions_index_body()["settings"]
    );
  }

  #[test]
  fn stopwords_match_original() {
    let body = files_index_body();
    let stop = &body["settings"]["analysis"]["filter"]["code_stop"]["stopwords"];
    assert_eq!(stop, &json!(["the", "and", "or", "if", "then", "else"]));
  }
}
