//! # Retrieval-Augmented Query Engine
//! Embeds a question, ranks the current index snapshot by cosine similarity,
//! and asks the synthesizer for an answer over the top-K items. Ranking is
//! pure and deterministic for a fixed snapshot; synthesis failures degrade to
//! the best match's summary instead of failing the request.

use std::sync::Arc;

use thiserror::Error;

use crate::embed::{cosine, Embedder};
use crate::index::{IndexEntry, RollingIndex};
use crate::synth::Synthesizer;

#[derive(Debug, Error)]
pub enum AskError {
    #[error("question must not be empty")]
    InvalidInput,
    #[error("no news indexed yet")]
    NoContent,
    #[error("failed to embed question: {0}")]
    EmbeddingFailed(#[source] anyhow::Error),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceRef {
    pub id: String,
    pub title: String,
    pub source_url: String,
    pub similarity: f32,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AskResponse {
    pub answer: String,
    /// Ranked best-first, same order the context was assembled in.
    pub sources: Vec<SourceRef>,
    /// True when synthesis was unavailable and the answer is the top match's
    /// summary verbatim.
    pub degraded: bool,
}

pub struct QueryEngine {
    index: Arc<RollingIndex>,
    embedder: Arc<dyn Embedder>,
    synth: Arc<dyn Synthesizer>,
    top_k: usize,
}

impl QueryEngine {
    pub fn new(
        index: Arc<RollingIndex>,
        embedder: Arc<dyn Embedder>,
        synth: Arc<dyn Synthesizer>,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            synth,
            top_k: top_k.max(1),
        }
    }

    pub async fn ask(&self, question: &str) -> Result<AskResponse, AskError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AskError::InvalidInput);
        }

        let qvec = self
            .embedder
            .embed(question)
            .await
            .map_err(AskError::EmbeddingFailed)?;

        let snapshot = self.index.snapshot();
        if snapshot.is_empty() {
            return Err(AskError::NoContent);
        }

        // Scoring happens on our own copy; no index lock is held here.
        let ranked = rank(&snapshot, &qvec);
        let k = self.top_k.min(ranked.len());
        let top = &ranked[..k];

        let sources: Vec<SourceRef> = top
            .iter()
            .map(|(e, sim)| SourceRef {
                id: e.item.id.clone(),
                title: e.item.title.clone(),
                source_url: e.item.source_url.clone(),
                similarity: *sim,
            })
            .collect();

        let context = top
            .iter()
            .map(|(e, _)| format!("- {}: {}", e.item.title, e.item.display_text()))
            .collect::<Vec<_>>()
            .join("\n");

        match self.synth.synthesize(question, &context).await {
            Ok(answer) => {
                metrics::counter!("query_answers_total").increment(1);
                Ok(AskResponse {
                    answer,
                    sources,
                    degraded: false,
                })
            }
            Err(e) => {
                metrics::counter!("query_degraded_total").increment(1);
                tracing::warn!(error = %e, provider = self.synth.name(), "synthesis failed; degrading");
                let best = &top[0].0;
                Ok(AskResponse {
                    answer: best.item.display_text().to_string(),
                    sources,
                    degraded: true,
                })
            }
        }
    }
}

/// Rank entries by cosine similarity to the question vector, descending.
/// Equal scores break toward the larger sequence number (fresher news wins).
pub fn rank(entries: &[Arc<IndexEntry>], qvec: &[f32]) -> Vec<(Arc<IndexEntry>, f32)> {
    let mut scored: Vec<(Arc<IndexEntry>, f32)> = entries
        .iter()
        .map(|e| (Arc::clone(e), cosine(&e.item.embedding, qvec)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| b.0.seq.cmp(&a.0.seq)));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{EnrichedItem, NewsItem};

    fn entry(id: &str, seq: u64, embedding: Vec<f32>) -> Arc<IndexEntry> {
        Arc::new(IndexEntry {
            seq,
            item: EnrichedItem::from_parts(
                NewsItem {
                    id: id.to_string(),
                    title: id.to_string(),
                    body: String::new(),
                    published_at: 0,
                    source_url: format!("https://example.com/{id}"),
                },
                format!("summary {id}"),
                embedding,
                0,
            ),
        })
    }

    #[test]
    fn rank_orders_by_similarity_desc() {
        let entries = vec![
            entry("far", 1, vec![0.0, 1.0]),
            entry("near", 2, vec![1.0, 0.0]),
            entry("mid", 3, vec![1.0, 1.0]),
        ];
        let ranked = rank(&entries, &[1.0, 0.0]);
        let ids: Vec<_> = ranked.iter().map(|(e, _)| e.item.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);
    }

    #[test]
    fn rank_breaks_ties_by_recency() {
        let entries = vec![
            entry("older", 1, vec![1.0, 0.0]),
            entry("newer", 2, vec![1.0, 0.0]),
        ];
        let ranked = rank(&entries, &[1.0, 0.0]);
        assert_eq!(ranked[0].0.item.id, "newer");
        assert_eq!(ranked[1].0.item.id, "older");
    }

    #[test]
    fn rank_is_deterministic() {
        let entries: Vec<_> = (0..20)
            .map(|i| entry(&format!("id{i}"), i as u64, vec![i as f32, 1.0]))
            .collect();
        let q = [3.0f32, 1.0];
        let a: Vec<_> = rank(&entries, &q).iter().map(|(e, _)| e.seq).collect();
        let b: Vec<_> = rank(&entries, &q).iter().map(|(e, _)| e.seq).collect();
        assert_eq!(a, b);
    }
}
