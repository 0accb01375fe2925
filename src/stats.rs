//! Shared pipeline counters for the /health endpoint. Prometheus series
//! cover dashboards; these atomics let health reporting read process-local
//! values without scraping.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

#[derive(Debug, Default)]
pub struct PipelineStats {
    published: AtomicU64,
    last_ingest_run: AtomicU64,
    last_index_apply: AtomicU64,
    malformed_dropped: AtomicU64,
}

impl PipelineStats {
    /// Monotonically non-decreasing count of items published by the producer.
    pub fn inc_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn mark_ingest_run(&self) {
        self.last_ingest_run.store(now_unix(), Ordering::Relaxed);
    }

    /// Unix ts of the last completed ingest cycle; 0 if none yet.
    pub fn last_ingest_run(&self) -> u64 {
        self.last_ingest_run.load(Ordering::Relaxed)
    }

    pub fn mark_index_apply(&self) {
        self.last_index_apply.store(now_unix(), Ordering::Relaxed);
    }

    pub fn last_index_apply(&self) -> u64 {
        self.last_index_apply.load(Ordering::Relaxed)
    }

    pub fn inc_malformed(&self) {
        self.malformed_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn malformed_dropped(&self) -> u64 {
        self.malformed_dropped.load(Ordering::Relaxed)
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}
