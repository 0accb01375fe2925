// src/ingest/mod.rs
pub mod feeds;
pub mod producer;
pub mod types;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;

use crate::dedup::Deduplicator;
use crate::ingest::types::{NewsFeed, NewsItem};
use crate::stats::PipelineStats;
use crate::transport::{Transport, TOPIC_RAW};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "Headlines parsed from the feed.");
        describe_counter!(
            "ingest_published_total",
            "Headlines accepted and published to the raw topic."
        );
        describe_counter!(
            "ingest_dedup_total",
            "Headlines suppressed by the dedup window."
        );
        describe_counter!("ingest_feed_errors_total", "Feed fetch/parse errors.");
        describe_counter!(
            "ingest_publish_dropped_total",
            "Headlines dropped after exhausting publish retries."
        );
        describe_gauge!(
            "ingest_last_run_ts",
            "Unix ts when the ingest cycle last ran."
        );
    });
}

/// Normalize headline text: decode HTML entities, strip tags, collapse
/// whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > 1000 {
        out = out.chars().take(1000).collect();
    }
    out
}

/// What one ingest cycle did, for logging and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleReport {
    pub fetched: usize,
    pub accepted: usize,
    pub published: usize,
    pub deduped: usize,
}

/// Run one fetch → dedup → publish cycle.
///
/// A failed fetch is logged and the cycle ends empty; the caller's timer
/// retries on the next tick (retry-by-next-cycle, respecting feed rate
/// limits). Publish failures are retried with bounded backoff for this batch
/// only; items that still fail are dropped.
pub async fn run_cycle(
    feed: &dyn NewsFeed,
    dedup: &Deduplicator,
    transport: &dyn Transport,
    stats: &PipelineStats,
) -> CycleReport {
    ensure_metrics_described();

    let raw = match feed.fetch_batch().await {
        Ok(v) => v,
        Err(e) => {
            counter!("ingest_feed_errors_total").increment(1);
            tracing::warn!(error = %e, feed = feed.name(), "fetch failed; retrying next cycle");
            // The cycle ran even though the feed was down; health should
            // show a live producer.
            stats.mark_ingest_run();
            return CycleReport::default();
        }
    };

    let mut report = CycleReport {
        fetched: raw.len(),
        ..CycleReport::default()
    };
    counter!("ingest_items_total").increment(raw.len() as u64);

    for mut item in raw {
        item.title = normalize_text(&item.title);
        item.body = normalize_text(&item.body);
        if item.title.is_empty() {
            continue;
        }

        if !dedup.observe(&item.id, None) {
            report.deduped += 1;
            counter!("ingest_dedup_total").increment(1);
            continue;
        }
        report.accepted += 1;

        if publish_with_retry(transport, TOPIC_RAW, &item).await {
            report.published += 1;
            stats.inc_published();
            counter!("ingest_published_total").increment(1);
        } else {
            counter!("ingest_publish_dropped_total").increment(1);
            tracing::warn!(id = %item.id, "dropping item after publish retries");
        }
    }

    stats.mark_ingest_run();
    gauge!("ingest_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

    report
}

const PUBLISH_ATTEMPTS: u32 = 3;

async fn publish_with_retry(transport: &dyn Transport, topic: &str, item: &NewsItem) -> bool {
    let record = match serde_json::to_string(item) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, id = %item.id, "failed to serialize item");
            return false;
        }
    };

    let mut delay = std::time::Duration::from_millis(200);
    for attempt in 1..=PUBLISH_ATTEMPTS {
        match transport.publish(topic, &record).await {
            Ok(()) => return true,
            Err(e) => {
                tracing::warn!(error = %e, attempt, id = %item.id, "publish failed");
                if attempt < PUBLISH_ATTEMPTS {
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
    false
}
