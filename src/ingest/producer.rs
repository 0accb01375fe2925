// src/ingest/producer.rs
use std::{sync::Arc, time::Duration};

use metrics::counter;
use rand::Rng;
use tokio::task::JoinHandle;

use crate::dedup::Deduplicator;
use crate::ingest::types::NewsFeed;
use crate::stats::PipelineStats;
use crate::transport::Transport;

#[derive(Clone, Copy, Debug)]
pub struct ProducerCfg {
    pub interval_secs: u64,
    /// Random delay before the first cycle, so restarts don't hammer the feed
    /// in lockstep. Zero disables it.
    pub start_jitter_secs: u64,
}

/// Spawn the ingestion producer: fetch a batch every `interval_secs`,
/// deduplicate, publish accepted items to the raw topic. A failed cycle is
/// logged and the ticker carries on; nothing terminates the loop.
pub fn spawn_producer(
    cfg: ProducerCfg,
    feed: Box<dyn NewsFeed>,
    dedup: Arc<Deduplicator>,
    transport: Arc<dyn Transport>,
    stats: Arc<PipelineStats>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if cfg.start_jitter_secs > 0 {
            let jitter_ms = rand::rng().random_range(0..=cfg.start_jitter_secs * 1000);
            tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
        }

        let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs.max(1)));
        tracing::info!(
            target: "ingest",
            feed = feed.name(),
            interval_secs = cfg.interval_secs,
            "ingestion producer started"
        );

        loop {
            ticker.tick().await;
            let report =
                crate::ingest::run_cycle(feed.as_ref(), &dedup, transport.as_ref(), &stats).await;

            counter!("ingest_runs_total").increment(1);
            tracing::info!(
                target: "ingest",
                fetched = report.fetched,
                accepted = report.accepted,
                published = report.published,
                deduped = report.deduped,
                "ingest tick"
            );
        }
    })
}
