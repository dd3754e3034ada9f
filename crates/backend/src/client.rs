use async_trait::async_trait;
use rewindex_core::Result;
use serde_json::Value;

use crate::types::{ScrollPage, SearchResponse};

/// Narrow capability interface over an external inverted-index engine
/// (spec component C4). Any full-text store satisfying this interface is
/// admissible; `ElasticsearchBackend` is one implementation.
#[async_trait]
pub trait SearchBackend: Send + Sync {
  async fn index_exists(&self, name: &str) -> Result<bool>;
  async fn create_index(&self, name: &str, schema: Value) -> Result<()>;
  async fn delete_index(&self, name: &str) -> Result<()>;
  async fn count(&self, name: &str) -> Result<u64>;
  async fn refresh(&self, name: &str) -> Result<()>;
  async fn get(&self, name: &str, doc_id: &str) -> Result<Option<Value>>;
  async fn put(&self, name: &str, doc_id: &str, source: Value) -> Result<()>;
  async fn search(&self, name: &str, query: Value) -> Result<SearchResponse>;
  async fn delete_by_query(&self, name: &str, query: Value) -> Result<u64>;

  /// Opens a scroll cursor over a result set larger than a single page.
  async fn scroll_start(&self, name: &str, query: Value, batch_size: usize) -> Result<ScrollPage>;
  /// Advances an open scroll cursor.
  async fn scroll_next(&self, scroll_id: &str) -> Result<ScrollPage>;
  /// Releases server-side scroll context. Best-effort: callers should not
  /// treat failure here as fatal.
  async fn scroll_clear(&self, scroll_id: &str) -> Result<()>;
}
