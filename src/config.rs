//! Environment-driven configuration. Every knob the core consumes is
//! operator-visible here; invalid values fall back to the documented default
//! with a warning rather than refusing to start.

use std::{fmt::Display, str::FromStr};

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Feed polling interval (seconds). `FETCH_INTERVAL_SECS`, default 60.
    pub fetch_interval_secs: u64,
    /// Rolling index capacity N. `INDEX_CAPACITY`, default 100.
    pub index_capacity: usize,
    /// Top-K entries fed to synthesis. `TOP_K`, default 5.
    pub top_k: usize,
    /// Embedding dimensionality D. `EMBEDDING_DIM`, default 384.
    pub embedding_dim: usize,
    /// Dedup retention window. `DEDUP_RETENTION_SECS`, default 2x the
    /// polling interval.
    pub dedup_retention_secs: u64,
    /// Max ids the deduplicator remembers. `DEDUP_CAPACITY`, default 1000.
    pub dedup_capacity: usize,
    /// NewsAPI key; empty disables the producer. `NEWSAPI_KEY`.
    pub newsapi_key: String,
    /// OpenAI-compatible embeddings endpoint; unset selects the local
    /// hashing embedder. `EMBEDDING_URL`.
    pub embedding_url: Option<String>,
    /// Embedding model name sent to the endpoint. `EMBEDDING_MODEL`.
    pub embedding_model: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let fetch_interval_secs: u64 = env_parse("FETCH_INTERVAL_SECS", 60);
        Self {
            fetch_interval_secs,
            index_capacity: env_parse::<usize>("INDEX_CAPACITY", 100).max(1),
            top_k: env_parse::<usize>("TOP_K", 5).max(1),
            embedding_dim: env_parse::<usize>("EMBEDDING_DIM", 384).max(1),
            dedup_retention_secs: env_parse(
                "DEDUP_RETENTION_SECS",
                fetch_interval_secs.saturating_mul(2),
            ),
            dedup_capacity: env_parse::<usize>("DEDUP_CAPACITY", 1000).max(1),
            newsapi_key: std::env::var("NEWSAPI_KEY").unwrap_or_default(),
            embedding_url: std::env::var("EMBEDDING_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            embedding_model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
{
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(%key, value = %raw, %default, "invalid value; using default");
                default
            }
        },
        Err(_) => default,
    }
}
