// tests/pipeline_e2e.rs
//
// Full pipeline over the in-memory transport: fixture feed → producer cycle →
// enrichment worker → index builder → query engine. No network, no clocks.

use std::{sync::Arc, time::Duration};

use newsflow::builder::spawn_builder;
use newsflow::dedup::Deduplicator;
use newsflow::embed::{Embedder, HashEmbedder};
use newsflow::enrich::spawn_enricher;
use newsflow::index::RollingIndex;
use newsflow::ingest::feeds::newsapi::NewsApiFeed;
use newsflow::ingest;
use newsflow::query::QueryEngine;
use newsflow::stats::PipelineStats;
use newsflow::synth::{DisabledSynthesizer, Synthesizer};
use newsflow::transport::{MemoryTransport, Transport, TOPIC_ENRICHED, TOPIC_RAW};

const DIM: usize = 32;

async fn wait_for_len(index: &RollingIndex, n: usize) {
    for _ in 0..200 {
        if index.len() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("index never reached {n} entries (got {})", index.len());
}

#[tokio::test]
async fn fixture_batch_flows_into_the_index_and_is_queryable() {
    let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new(64));
    let index = Arc::new(RollingIndex::with_capacity(100));
    let stats = Arc::new(PipelineStats::default());
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(DIM));
    let synth: Arc<dyn Synthesizer> = Arc::new(DisabledSynthesizer);

    // Subscribe both workers before anything is published.
    let enriched_stream = transport.subscribe(TOPIC_ENRICHED).await;
    let raw_stream = transport.subscribe(TOPIC_RAW).await;
    let _builder = spawn_builder(enriched_stream, index.clone(), stats.clone(), DIM);
    let _enricher = spawn_enricher(raw_stream, transport.clone(), embedder.clone(), synth.clone());

    let feed = NewsApiFeed::from_fixture_str(include_str!("fixtures/newsapi_top.json"));
    let dedup = Deduplicator::new(Duration::from_secs(600), 1000);
    let report = ingest::run_cycle(&feed, &dedup, transport.as_ref(), &stats).await;
    assert_eq!(report.published, 3);

    wait_for_len(&index, 3).await;
    assert!(stats.last_index_apply() > 0);

    // Every entry carries a correctly sized embedding and a summary.
    for entry in index.snapshot() {
        assert_eq!(entry.item.embedding.len(), DIM);
        assert!(!entry.item.summary.is_empty());
    }

    // Query path: synthesis is disabled, so the answer degrades to the top
    // match but still names the right story.
    let engine = QueryEngine::new(index.clone(), embedder, synth, 5);
    let resp = engine.ask("how bad was the storm on the gulf coast?").await.unwrap();
    assert!(resp.degraded);
    assert!(!resp.answer.is_empty());
    assert!(resp.sources[0].title.to_lowercase().contains("storm"));

    // Re-running the cycle changes nothing: dedup holds the line.
    let report = ingest::run_cycle(&feed, &dedup, transport.as_ref(), &stats).await;
    assert_eq!(report.published, 0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(index.len(), 3);
}

#[tokio::test]
async fn malformed_enriched_records_are_dropped_not_fatal() {
    let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new(64));
    let index = Arc::new(RollingIndex::with_capacity(100));
    let stats = Arc::new(PipelineStats::default());

    let enriched_stream = transport.subscribe(TOPIC_ENRICHED).await;
    let _builder = spawn_builder(enriched_stream, index.clone(), stats.clone(), DIM);

    // Garbage, then a record with no embedding, then a good record.
    transport.publish(TOPIC_ENRICHED, "not json").await.unwrap();
    transport
        .publish(
            TOPIC_ENRICHED,
            r#"{"id":"bad","title":"t","body":"b","published_at":0,"source_url":"u","summary":"s","embedding":[],"embedded_at":0}"#,
        )
        .await
        .unwrap();
    let good = serde_json::json!({
        "id": "good",
        "title": "t",
        "body": "b",
        "published_at": 0,
        "source_url": "u",
        "summary": "s",
        "embedding": vec![0.5f32; DIM],
        "embedded_at": 0
    });
    transport
        .publish(TOPIC_ENRICHED, &good.to_string())
        .await
        .unwrap();

    wait_for_len(&index, 1).await;
    assert_eq!(index.len(), 1);
    assert_eq!(index.snapshot()[0].item.id, "good");
    assert_eq!(stats.malformed_dropped(), 2);
}
