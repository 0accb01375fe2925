// tests/producer_ingest.rs
//
// Ingest cycle against the embedded NewsAPI fixture: accepted items land on
// the raw topic as parseable records, and a second cycle is fully deduped.

use std::time::Duration;

use newsflow::dedup::Deduplicator;
use newsflow::ingest::feeds::newsapi::NewsApiFeed;
use newsflow::ingest::types::NewsItem;
use newsflow::ingest;
use newsflow::stats::PipelineStats;
use newsflow::transport::{MemoryTransport, RecordStream as _, Transport, TOPIC_RAW};

#[tokio::test]
async fn cycle_publishes_fixture_items_once() {
    let fixture = include_str!("fixtures/newsapi_top.json");
    let feed = NewsApiFeed::from_fixture_str(fixture);
    let dedup = Deduplicator::new(Duration::from_secs(600), 1000);
    let transport = MemoryTransport::new(64);
    let stats = PipelineStats::default();

    let mut raw = transport.subscribe(TOPIC_RAW).await;

    let report = ingest::run_cycle(&feed, &dedup, &transport, &stats).await;
    assert_eq!(report.fetched, 3);
    assert_eq!(report.accepted, 3);
    assert_eq!(report.published, 3);
    assert_eq!(report.deduped, 0);
    assert_eq!(stats.published(), 3);
    assert!(stats.last_ingest_run() > 0);

    for _ in 0..3 {
        let record = raw.next().await.expect("record on raw topic");
        let item: NewsItem = serde_json::from_str(&record).expect("record parses as NewsItem");
        assert!(!item.id.is_empty());
        assert!(!item.title.is_empty());
        assert!(item.source_url.starts_with("https://example.com/"));
    }

    // Second cycle: every id is still inside the dedup window.
    let report = ingest::run_cycle(&feed, &dedup, &transport, &stats).await;
    assert_eq!(report.fetched, 3);
    assert_eq!(report.accepted, 0);
    assert_eq!(report.deduped, 3);
    assert_eq!(stats.published(), 3, "published count must not grow");
}

#[tokio::test]
async fn failed_fetch_reports_empty_cycle() {
    // Garbage payload: fetch_batch fails with InvalidResponse and the cycle
    // ends without publishing or panicking.
    let feed = NewsApiFeed::from_fixture_str("this is not json");
    let dedup = Deduplicator::new(Duration::from_secs(600), 1000);
    let transport = MemoryTransport::new(64);
    let stats = PipelineStats::default();

    let report = ingest::run_cycle(&feed, &dedup, &transport, &stats).await;
    assert_eq!(report.fetched, 0);
    assert_eq!(report.published, 0);
    assert_eq!(stats.published(), 0);
}
