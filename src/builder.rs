//! # Index Builder
//! Drains the enriched-item stream in arrival order and applies each record
//! to the rolling index. A malformed record is dropped with a log entry; one
//! bad item never stalls the loop.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use metrics::counter;
use tokio::task::JoinHandle;

use crate::index::RollingIndex;
use crate::ingest::types::EnrichedItem;
use crate::stats::PipelineStats;
use crate::transport::RecordStream;

/// Spawn the builder loop over an already-subscribed enriched stream.
/// Subscribing happens at wiring time so no published record can race past
/// an unsubscribed builder.
pub fn spawn_builder(
    mut stream: Box<dyn RecordStream>,
    index: Arc<RollingIndex>,
    stats: Arc<PipelineStats>,
    embedding_dim: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(target: "builder", capacity = index.capacity(), "index builder started");

        while let Some(record) = stream.next().await {
            match parse_enriched(&record, embedding_dim) {
                Ok(item) => {
                    let id = item.id.clone();
                    let outcome = index.upsert(item);
                    stats.mark_index_apply();
                    counter!("builder_applied_total").increment(1);
                    if let Some(evicted) = &outcome.evicted {
                        counter!("builder_evicted_total").increment(1);
                        tracing::debug!(
                            target: "builder",
                            evicted = %evicted.item.id,
                            evicted_seq = evicted.seq,
                            "evicted oldest entry"
                        );
                    }
                    tracing::debug!(
                        target: "builder",
                        %id,
                        seq = outcome.seq,
                        refreshed = outcome.refreshed,
                        "applied enriched item"
                    );
                }
                Err(e) => {
                    stats.inc_malformed();
                    counter!("builder_malformed_total").increment(1);
                    tracing::warn!(target: "builder", error = %e, "dropping malformed enriched record");
                }
            }
        }

        tracing::warn!(target: "builder", "enriched stream closed; index builder exiting");
    })
}

/// Validate one wire record. `expected_dim == 0` skips the dimension check
/// (used when the embedding model's width is operator-unknown).
pub fn parse_enriched(record: &str, expected_dim: usize) -> Result<EnrichedItem> {
    let item: EnrichedItem = serde_json::from_str(record).context("parsing enriched record")?;
    if item.id.trim().is_empty() {
        bail!("enriched record has an empty id");
    }
    if item.embedding.is_empty() {
        bail!("enriched record {} has no embedding", item.id);
    }
    if expected_dim > 0 && item.embedding.len() != expected_dim {
        bail!(
            "enriched record {} has embedding dim {} (expected {})",
            item.id,
            item.embedding.len(),
            expected_dim
        );
    }
    Ok(item)
}
