//! # Embedder
//! Text-to-vector seam shared by the enrichment worker and the query engine.
//! Both sides must use the same instance so question and item embeddings live
//! in the same space; mismatched models make cosine similarity meaningless.

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    /// Fixed output dimensionality `D`.
    fn dimension(&self) -> usize;
}

/// Cosine similarity; 0.0 on dimension mismatch or zero norm.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint.
pub struct HttpEmbedder {
    http: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl HttpEmbedder {
    pub fn new(url: &str, model: &str, dimension: usize) -> Self {
        let api_key = std::env::var("EMBEDDING_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .unwrap_or_default();
        let http = reqwest::Client::builder()
            .user_agent("newsflow/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            http,
            url: url.to_string(),
            api_key,
            model: model.to_string(),
            dimension,
        }
    }
}

#[async_trait::async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            input: [&'a str; 1],
        }
        #[derive(Deserialize)]
        struct Resp {
            data: Vec<Row>,
        }
        #[derive(Deserialize)]
        struct Row {
            embedding: Vec<f32>,
        }

        let mut req = self.http.post(&self.url).json(&Req {
            model: &self.model,
            input: [text],
        });
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }

        let resp = req.send().await.context("embedding request")?;
        if !resp.status().is_success() {
            bail!("embedding endpoint returned {}", resp.status());
        }
        let body: Resp = resp.json().await.context("embedding response body")?;
        let vector = body
            .data
            .into_iter()
            .next()
            .map(|r| r.embedding)
            .unwrap_or_default();
        if vector.len() != self.dimension {
            bail!(
                "embedding dimension {} does not match configured {}",
                vector.len(),
                self.dimension
            );
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Deterministic local embedder: hashes tokens into a fixed-dim bag and
/// L2-normalizes. No semantic quality, but stable, offline, and good enough
/// for overlap-based retrieval when no embedding endpoint is configured.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }
}

#[async_trait::async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dimension];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let h = hasher.finish();
            let bucket = (h % self.dimension as u64) as usize;
            let sign = if (h >> 32) & 1 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        Ok(v)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
