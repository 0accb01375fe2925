//! In-process enrichment worker: bridges the raw topic to the enriched topic
//! by adding a summary and an embedding. Deployments with an external
//! streaming stage publish to the enriched topic themselves and simply don't
//! spawn this worker.

use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use metrics::counter;
use tokio::task::JoinHandle;

use crate::embed::Embedder;
use crate::ingest::types::{EnrichedItem, NewsItem};
use crate::synth::{summarize_item, Synthesizer};
use crate::transport::{RecordStream, Transport, TOPIC_ENRICHED};

pub fn spawn_enricher(
    mut stream: Box<dyn RecordStream>,
    transport: Arc<dyn Transport>,
    embedder: Arc<dyn Embedder>,
    synth: Arc<dyn Synthesizer>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(target: "enrich", dim = embedder.dimension(), "enrichment worker started");

        while let Some(record) = stream.next().await {
            let raw: NewsItem = match serde_json::from_str(&record) {
                Ok(v) => v,
                Err(e) => {
                    counter!("enrich_malformed_total").increment(1);
                    tracing::warn!(target: "enrich", error = %e, "dropping malformed raw record");
                    continue;
                }
            };

            let text = format!("{}. {}", raw.title, raw.body);
            let summary = summarize_item(synth.as_ref(), &text).await;

            let embedding = match embedder.embed(&summary).await {
                Ok(v) => v,
                Err(e) => {
                    counter!("enrich_embed_errors_total").increment(1);
                    tracing::warn!(target: "enrich", error = %e, id = %raw.id, "embedding failed; item skipped");
                    continue;
                }
            };

            let enriched = EnrichedItem::from_parts(raw, summary, embedding, now_unix());
            match serde_json::to_string(&enriched) {
                Ok(json) => {
                    if let Err(e) = transport.publish(TOPIC_ENRICHED, &json).await {
                        tracing::warn!(target: "enrich", error = %e, id = %enriched.id, "publish failed");
                        continue;
                    }
                    counter!("enrich_items_total").increment(1);
                }
                Err(e) => {
                    tracing::warn!(target: "enrich", error = %e, id = %enriched.id, "serialize failed");
                }
            }
        }

        tracing::warn!(target: "enrich", "raw stream closed; enrichment worker exiting");
    })
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}
