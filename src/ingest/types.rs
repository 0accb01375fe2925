// src/ingest/types.rs
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Raw headline as fetched from a feed. Immutable once created.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub id: String, // stable hash of the source URL
    pub title: String,
    pub body: String,
    pub published_at: u64, // unix seconds
    pub source_url: String,
}

/// A `NewsItem` after the enrichment stage added a summary and an embedding.
/// Flat on the wire: enrichment preserves the raw fields and appends its own.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EnrichedItem {
    pub id: String,
    pub title: String,
    pub body: String,
    pub published_at: u64,
    pub source_url: String,
    pub summary: String,
    pub embedding: Vec<f32>,
    pub embedded_at: u64, // unix seconds
}

impl EnrichedItem {
    pub fn from_parts(item: NewsItem, summary: String, embedding: Vec<f32>, embedded_at: u64) -> Self {
        Self {
            id: item.id,
            title: item.title,
            body: item.body,
            published_at: item.published_at,
            source_url: item.source_url,
            summary,
            embedding,
            embedded_at,
        }
    }

    /// Text a query should read for this item: the summary, or the body when
    /// enrichment produced none.
    pub fn display_text(&self) -> &str {
        if self.summary.trim().is_empty() {
            &self.body
        } else {
            &self.summary
        }
    }
}

/// Stable item id: hex SHA-256 of the trimmed source URL.
pub fn item_id(source_url: &str) -> String {
    let digest = Sha256::digest(source_url.trim().as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed rate limited")]
    RateLimited,
    #[error("feed network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid feed response: {0}")]
    InvalidResponse(String),
}

#[async_trait::async_trait]
pub trait NewsFeed: Send + Sync {
    async fn fetch_batch(&self) -> Result<Vec<NewsItem>, FeedError>;
    fn name(&self) -> &'static str;
}
