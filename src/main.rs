//! Breaking-News RAG Service — Binary Entrypoint
//! Wires the ingestion producer, enrichment worker, and index builder around
//! one rolling vector index, then serves the query surface over Axum.

use std::{sync::Arc, time::Duration};

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newsflow::api::{self, AppState};
use newsflow::builder::spawn_builder;
use newsflow::config::AppConfig;
use newsflow::dedup::Deduplicator;
use newsflow::embed::{Embedder, HashEmbedder, HttpEmbedder};
use newsflow::enrich::spawn_enricher;
use newsflow::index::RollingIndex;
use newsflow::ingest::feeds::newsapi::NewsApiFeed;
use newsflow::ingest::producer::{spawn_producer, ProducerCfg};
use newsflow::metrics::Metrics;
use newsflow::query::QueryEngine;
use newsflow::stats::PipelineStats;
use newsflow::synth;
use newsflow::transport::{MemoryTransport, Transport, TOPIC_ENRICHED, TOPIC_RAW};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - NEWSFLOW_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("NEWSFLOW_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newsflow=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    enable_dev_tracing();

    let cfg = AppConfig::from_env();
    let metrics = Metrics::init(cfg.index_capacity);

    // One index instance, constructed here and handed to both the builder
    // and the query engine; no ambient singletons.
    let index = Arc::new(RollingIndex::with_capacity(cfg.index_capacity));
    let stats = Arc::new(PipelineStats::default());
    let dedup = Arc::new(Deduplicator::new(
        Duration::from_secs(cfg.dedup_retention_secs),
        cfg.dedup_capacity,
    ));
    let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new(1024));

    let embedder: Arc<dyn Embedder> = match &cfg.embedding_url {
        Some(url) => Arc::new(HttpEmbedder::new(url, &cfg.embedding_model, cfg.embedding_dim)),
        None => {
            tracing::warn!("EMBEDDING_URL not set; using local hashing embedder");
            Arc::new(HashEmbedder::new(cfg.embedding_dim))
        }
    };
    let synthesizer = synth::build_synthesizer();

    // Subscribe before the producer can publish anything.
    let enriched_stream = transport.subscribe(TOPIC_ENRICHED).await;
    let raw_stream = transport.subscribe(TOPIC_RAW).await;

    let _builder = spawn_builder(
        enriched_stream,
        index.clone(),
        stats.clone(),
        cfg.embedding_dim,
    );
    let _enricher = spawn_enricher(
        raw_stream,
        transport.clone(),
        embedder.clone(),
        synthesizer.clone(),
    );

    if cfg.newsapi_key.is_empty() {
        tracing::warn!("NEWSAPI_KEY not set; ingestion producer disabled");
    } else {
        let feed = Box::new(NewsApiFeed::from_api_key(&cfg.newsapi_key));
        let _producer = spawn_producer(
            ProducerCfg {
                interval_secs: cfg.fetch_interval_secs,
                start_jitter_secs: 3,
            },
            feed,
            dedup.clone(),
            transport.clone(),
            stats.clone(),
        );
    }

    let engine = Arc::new(QueryEngine::new(
        index.clone(),
        embedder,
        synthesizer,
        cfg.top_k,
    ));
    let state = AppState {
        index,
        engine,
        stats,
    };
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
