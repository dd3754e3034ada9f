pub mod client;
pub mod elasticsearch;
pub mod schema;
pub mod types;

pub use client::SearchBackend;
pub use elasticsearch::ElasticsearchBackend;
pub use types::{ScrollPage, SearchHit, SearchResponse};
