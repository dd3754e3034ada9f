//! An in-memory `SearchBackend` used only by this crate's unit tests, so
//! the Version Store's algorithm can be exercised without a live
//! Elasticsearch instance.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rewindex_backend::{ScrollPage, SearchBackend, SearchHit, SearchResponse};
use rewindex_core::Result;
use serde_json::Value;

#[derive(Default)]
pub struct MemoryBackend {
  indices: Mutex<HashMap<String, HashMap<String, Value>>>,
}

fn term_matches(doc: &Value, field: &str, expected: &Value) -> bool {
  doc.get(field).map(|v| v == expected).unwrap_or(false)
}

fn range_matches(doc: &Value, field: &str, bound: &Value) -> bool {
  let Some(doc_val) = doc.get(field).and_then(|v| v.as_i64()) else { return false };
  if let Some(lte) = bound.get("lte").and_then(|v| v.as_i64()) {
    return doc_val <= lte;
  }
  true
}

fn matches_clause(doc: &Value, clause: &Value) -> bool {
  if let Some(term) = clause.get("term").and_then(|v| v.as_object()) {
    return term.iter().all(|(f, val)| term_matches(doc, f, val));
  }
  if let Some(range) = clause.get("range").and_then(|v| v.as_object()) {
    return range.iter().all(|(f, bound)| range_matches(doc, f, bound));
  }
  true
}

#[async_trait]
impl SearchBackend for MemoryBackend {
  async fn index_exists(&self, name: &str) -> Result<bool> {
    Ok(self.indices.lock().unwrap().contains_key(name))
  }

  async fn create_index(&self, name: &str, _schema: Value) -> Result<()> {
    self.indices.lock().unwrap().entry(name.to_string()).or_default();
    Ok(())
  }

  async fn delete_index(&self, name: &str) -> Result<()> {
    self.indices.lock().unwrap().remove(name);
    Ok(())
  }

  async fn count(&self, name: &str) -> Result<u64> {
    Ok(self.indices.lock().unwrap().get(name).map(|m| m.len()).unwrap_or(0) as u64)
  }

  async fn refresh(&self, _name: &str) -> Result<()> {
    Ok(())
  }

  async fn get(&self, name: &str, doc_id: &str) -> Result<Option<Value>> {
    Ok(self.indices.lock().unwrap().get(name).and_then(|m| m.get(doc_id).cloned()))
  }

  async fn put(&self, name: &str, doc_id: &str, source: Value) -> Result<()> {
    self
      .indices
      .lock()
      .unwrap()
      .entry(name.to_string())
      .or_default()
      .insert(doc_id.to_string(), source);
    Ok(())
  }

  async fn search(&self, name: &str, query: Value) -> Result<SearchResponse> {
    let indices = self.indices.lock().unwrap();
    let empty = HashMap::new();
    let docs = indices.get(name).unwrap_or(&empty);

    let clauses: Vec<Value> = query["query"]["bool"]["filter"]
      .as_array()
      .cloned()
      .unwrap_or_default();

    let mut hits: Vec<(String, Value)> = docs
      .iter()
      .filter(|(_, doc)| clauses.iter().all(|c| matches_clause(doc, c)))
      .map(|(id, doc)| (id.clone(), doc.clone()))
      .collect();

    if let Some(sort) = query["sort"].as_array().and_then(|a| a.first()) {
      if let Some(obj) = sort.as_object() {
        if let Some((field, dir)) = obj.iter().next() {
          let desc = dir == "desc" || dir.get("order").and_then(|o| o.as_str()) == Some("desc");
          let field = field.clone();
          hits.sort_by(|a, b| {
            let av = a.1.get(&field).and_then(|v| v.as_i64()).unwrap_or(0);
            let bv = b.1.get(&field).and_then(|v| v.as_i64()).unwrap_or(0);
            if desc { bv.cmp(&av) } else { av.cmp(&bv) }
          });
        }
      }
    }

    if let Some(size) = query["size"].as_u64() {
      hits.truncate(size as usize);
    }

    let total = hits.len() as u64;
    let out_hits = hits
      .into_iter()
      .map(|(id, source)| SearchHit { id, score: 1.0, source, highlight: HashMap::new() })
      .collect();
    Ok(SearchResponse { total_hits: total, hits: out_hits, took_ms: Some(0), aggregations: None })
  }

  async fn delete_by_query(&self, name: &str, query: Value) -> Result<u64> {
    let clauses: Vec<Value> = query["query"]["bool"]["filter"].as_array().cloned().unwrap_or_default();
    let mut indices = self.indices.lock().unwrap();
    let Some(docs) = indices.get_mut(name) else { return Ok(0) };
    let to_remove: Vec<String> = docs
      .iter()
      .filter(|(_, doc)| clauses.iter().all(|c| matches_clause(doc, c)))
      .map(|(id, _)| id.clone())
      .collect();
    for id in &to_remove {
      docs.remove(id);
    }
    Ok(to_remove.len() as u64)
  }

  async fn scroll_start(&self, name: &str, query: Value, batch_size: usize) -> Result<ScrollPage> {
    let resp = self.search(name, query).await?;
    let hits = resp.hits.into_iter().take(batch_size).collect();
    Ok(ScrollPage { hits, scroll_id: None })
  }

  async fn scroll_next(&self, _scroll_id: &str) -> Result<ScrollPage> {
    Ok(ScrollPage { hits: Vec::new(), scroll_id: None })
  }

  async fn scroll_clear(&self, _scroll_id: &str) -> Result<()> {
    Ok(())
  }
}
