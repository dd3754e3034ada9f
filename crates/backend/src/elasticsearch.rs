use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Client, StatusCode};
use rewindex_core::{RewindexError, Result};
use serde_json::{Value, json};

use crate::client::SearchBackend;
use crate::types::{ScrollPage, SearchHit, SearchResponse};

const READ_TIMEOUT: Duration = Duration::from_secs(30);
const SCROLL_TIMEOUT: Duration = Duration::from_secs(30);
const REFRESH_TIMEOUT: Duration = Duration::from_secs(10);
const SCROLL_TTL: &str = "1m";

/// An Elasticsearch-compatible HTTP backend, grounded on
/// `original_source/rewindex/es.py`'s `ESClient`.
pub struct ElasticsearchBackend {
  client: Client,
  base_url: String,
}

impl ElasticsearchBackend {
  pub fn new(base_url: impl Into<String>) -> Self {
    ElasticsearchBackend {
      client: Client::new(),
      base_url: base_url.into().trim_end_matches('/').to_string(),
    }
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  /// Document ids are `"{project_id}:{relative_path}"` and routinely
  /// contain `/`; percent-encode before interpolating into a URL path
  /// segment, matching `es.py`'s `quote(doc_id, safe='')`.
  fn doc_url(&self, name: &str, doc_id: &str) -> String {
    let encoded = utf8_percent_encode(doc_id, NON_ALPHANUMERIC).to_string();
    self.url(&format!("/{name}/_doc/{encoded}"))
  }

  async fn map_error(resp: reqwest::Response) -> RewindexError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    RewindexError::BackendError { status, body }
  }

  fn map_transport_error(err: reqwest::Error) -> RewindexError {
    RewindexError::BackendUnreachable(err.to_string())
  }

  fn parse_search_response(body: Value) -> SearchResponse {
    let took_ms = body.get("took").and_then(|v| v.as_u64());
    let total_hits = body["hits"]["total"]["value"]
      .as_u64()
      .or_else(|| body["hits"]["total"].as_u64())
      .unwrap_or(0);
    let hits = body["hits"]["hits"]
      .as_array()
      .cloned()
      .unwrap_or_default()
      .into_iter()
      .map(|h| SearchHit {
        id: h["_id"].as_str().unwrap_or_default().to_string(),
        score: h["_score"].as_f64().unwrap_or(0.0) as f32,
        source: h["_source"].clone(),
        highlight: h["highlight"]
          .as_object()
          .map(|m| {
            m.iter()
              .map(|(k, v)| {
                (
                  k.clone(),
                  v.as_array()
                    .map(|arr| arr.iter().filter_map(|s| s.as_str().map(str::to_string)).collect())
                    .unwrap_or_default(),
                )
              })
              .collect()
          })
          .unwrap_or_default(),
      })
      .collect();
    let aggregations = body.get("aggregations").cloned();
    SearchResponse { total_hits, hits, took_ms, aggregations }
  }

  fn scroll_page_from(body: Value) -> ScrollPage {
    let scroll_id = body["_scroll_id"].as_str().map(str::to_string);
    let parsed = Self::parse_search_response(body);
    let scroll_id = if parsed.hits.is_empty() { None } else { scroll_id };
    ScrollPage { hits: parsed.hits, scroll_id }
  }
}

#[async_trait]
impl SearchBackend for ElasticsearchBackend {
  async fn index_exists(&self, name: &str) -> Result<bool> {
    let resp = self
      .client
      .head(self.url(&format!("/{name}")))
      .timeout(READ_TIMEOUT)
      .send()
      .await
      .map_err(Self::map_transport_error)?;
    match resp.status() {
      StatusCode::OK => Ok(true),
      StatusCode::NOT_FOUND => Ok(false),
      _ => Err(Self::map_error(resp).await),
    }
  }

  async fn create_index(&self, name: &str, schema: Value) -> Result<()> {
    let resp = self
      .client
      .put(self.url(&format!("/{name}")))
      .timeout(READ_TIMEOUT)
      .json(&schema)
      .send()
      .await
      .map_err(Self::map_transport_error)?;
    if resp.status().is_success() {
      Ok(())
    } else {
      Err(Self::map_error(resp).await)
    }
  }

  async fn delete_index(&self, name: &str) -> Result<()> {
    let resp = self
      .client
      .delete(self.url(&format!("/{name}")))
      .timeout(READ_TIMEOUT)
      .send()
      .await
      .map_err(Self::map_transport_error)?;
    if resp.status().is_success() || resp.status() == StatusCode::NOT_FOUND {
      Ok(())
    } else {
      Err(Self::map_error(resp).await)
    }
  }

  async fn count(&self, name: &str) -> Result<u64> {
    let resp = self
      .client
      .get(self.url(&format!("/{name}/_count")))
      .timeout(READ_TIMEOUT)
      .send()
      .await
      .map_err(Self::map_transport_error)?;
    if !resp.status().is_success() {
      return Err(Self::map_error(resp).await);
    }
    let body: Value = resp.json().await.map_err(Self::map_transport_error)?;
    Ok(body["count"].as_u64().unwrap_or(0))
  }

  async fn refresh(&self, name: &str) -> Result<()> {
    let resp = self
      .client
      .post(self.url(&format!("/{name}/_refresh")))
      .timeout(REFRESH_TIMEOUT)
      .send()
      .await
      .map_err(Self::map_transport_error)?;
    if resp.status().is_success() {
      Ok(())
    } else {
      Err(Self::map_error(resp).await)
    }
  }

  async fn get(&self, name: &str, doc_id: &str) -> Result<Option<Value>> {
    let resp = self
      .client
      .get(self.doc_url(name, doc_id))
      .timeout(READ_TIMEOUT)
      .send()
      .await
      .map_err(Self::map_transport_error)?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    if !resp.status().is_success() {
      return Err(Self::map_error(resp).await);
    }
    let body: Value = resp.json().await.map_err(Self::map_transport_error)?;
    Ok(body.get("_source").cloned())
  }

  async fn put(&self, name: &str, doc_id: &str, source: Value) -> Result<()> {
    let resp = self
      .client
      .put(self.doc_url(name, doc_id))
      .timeout(READ_TIMEOUT)
      .json(&source)
      .send()
      .await
      .map_err(Self::map_transport_error)?;
    if resp.status().is_success() {
      Ok(())
    } else {
      Err(Self::map_error(resp).await)
    }
  }

  async fn search(&self, name: &str, query: Value) -> Result<SearchResponse> {
    let resp = self
      .client
      .post(self.url(&format!("/{name}/_search")))
      .timeout(READ_TIMEOUT)
      .json(&query)
      .send()
      .await
      .map_err(Self::map_transport_error)?;
    if !resp.status().is_success() {
      return Err(Self::map_error(resp).await);
    }
    let body: Value = resp.json().await.map_err(Self::map_transport_error)?;
    Ok(Self::parse_search_response(body))
  }

  async fn delete_by_query(&self, name: &str, query: Value) -> Result<u64> {
    let resp = self
      .client
      .post(self.url(&format!("/{name}/_delete_by_query")))
      .timeout(READ_TIMEOUT)
      .json(&query)
      .send()
      .await
      .map_err(Self::map_transport_error)?;
    if !resp.status().is_success() {
      return Err(Self::map_error(resp).await);
    }
    let body: Value = resp.json().await.map_err(Self::map_transport_error)?;
    Ok(body["deleted"].as_u64().unwrap_or(0))
  }

  async fn scroll_start(&self, name: &str, mut query: Value, batch_size: usize) -> Result<ScrollPage> {
    if let Some(obj) = query.as_object_mut() {
      obj.insert("size".to_string(), json!(batch_size));
    }
    let resp = self
      .client
      .post(self.url(&format!("/{name}/_search")))
      .query(&[("scroll", SCROLL_TTL)])
      .timeout(SCROLL_TIMEOUT)
      .json(&query)
      .send()
      .await
      .map_err(Self::map_transport_error)?;
    if !resp.status().is_success() {
      return Err(Self::map_error(resp).await);
    }
    let body: Value = resp.json().await.map_err(Self::map_transport_error)?;
    Ok(Self::scroll_page_from(body))
  }

  async fn scroll_next(&self, scroll_id: &str) -> Result<ScrollPage> {
    let resp = self
      .client
      .post(self.url("/_search/scroll"))
      .timeout(SCROLL_TIMEOUT)
      .json(&json!({ "scroll": SCROLL_TTL, "scroll_id": scroll_id }))
      .send()
      .await
      .map_err(Self::map_transport_error)?;
    if !resp.status().is_success() {
      return Err(Self::map_error(resp).await);
    }
    let body: Value = resp.json().await.map_err(Self::map_transport_error)?;
    Ok(Self::scroll_page_from(body))
  }

  async fn scroll_clear(&self, scroll_id: &str) -> Result<()> {
    let resp = self
      .client
      .delete(self.url("/_search/scroll"))
      .timeout(READ_TIMEOUT)
      .json(&json!({ "scroll_id": [scroll_id] }))
      .send()
      .await
      .map_err(Self::map_transport_error)?;
    if resp.status().is_success() || resp.status() == StatusCode::NOT_FOUND {
      Ok(())
    } else {
      tracing::warn!(status = %resp.status(), "failed to clear scroll context");
      Ok(())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  #[tokio::test]
  async fn index_exists_true_on_200() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
      .and(path("/rewindex_files"))
      .respond_with(ResponseTemplate::new(200))
      .mount(&server)
      .await;
    let backend = ElasticsearchBackend::new(server.uri());
    assert!(backend.index_exists("rewindex_files").await.unwrap());
  }

  #[tokio::test]
  async fn index_exists_false_on_404() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
      .and(path("/rewindex_files"))
      .respond_with(ResponseTemplate::new(404))
      .mount(&server)
      .await;
    let backend = ElasticsearchBackend::new(server.uri());
    assert!(!backend.index_exists("rewindex_files").await.unwrap());
  }

  #[tokio::test]
  async fn unreachable_host_surfaces_backend_unreachable() {
    let backend = ElasticsearchBackend::new("http://127.0.0.1:1");
    let err = backend.count("rewindex_files").await.unwrap_err();
    assert!(matches!(err, RewindexError::BackendUnreachable(_)));
  }

  #[tokio::test]
  async fn search_parses_hits_and_highlight() {
    let server = MockServer::start().await;
    let body = json!({
      "took": 3,
      "hits": {
        "total": { "value": 1 },
        "hits": [{
          "_id": "p1:a.py",
          "_score": 1.5,
          "_source": { "file_path": "a.py" },
          "highlight": { "content": ["<mark>print</mark>(1)"] }
        }]
      }
    });
    Mock::given(method("POST"))
      .and(path("/rewindex_files/_search"))
      .respond_with(ResponseTemplate::new(200).set_body_json(&body))
      .mount(&server)
      .await;
    let backend = ElasticsearchBackend::new(server.uri());
    let resp = backend.search("rewindex_files", json!({"query": {"match_all": {}}})).await.unwrap();
    assert_eq!(resp.total_hits, 1);
    assert_eq!(resp.hits[0].id, "p1:a.py");
    assert_eq!(resp.hits[0].highlight["content"][0], "<mark>print</mark>(1)");
  }

  #[tokio::test]
  async fn get_percent_encodes_a_slash_bearing_doc_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/rewindex_files/_doc/p1%3Asrc%2Fa.py"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_source": { "relative_path": "src/a.py" } })))
      .mount(&server)
      .await;
    let backend = ElasticsearchBackend::new(server.uri());
    let doc = backend.get("rewindex_files", "p1:src/a.py").await.unwrap();
    assert_eq!(doc.unwrap()["relative_path"], "src/a.py");
  }

  #[tokio::test]
  async fn put_percent_encodes_a_slash_bearing_doc_id() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
      .and(path("/rewindex_files/_doc/p1%3Asrc%2Fa.py"))
      .respond_with(ResponseTemplate::new(200))
      .mount(&server)
      .await;
    let backend = ElasticsearchBackend::new(server.uri());
    backend.put("rewindex_files", "p1:src/a.py", json!({ "relative_path": "src/a.py" })).await.unwrap();
  }

  #[tokio::test]
  async fn error_status_maps_to_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/rewindex_files/_count"))
      .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
      .mount(&server)
      .await;
    let backend = ElasticsearchBackend::new(server.uri());
    let err = backend.count("rewindex_files").await.unwrap_err();
    match err {
      RewindexError::BackendError { status, body } => {
        assert_eq!(status, 500);
        assert_eq!(body, "boom");
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }
}
