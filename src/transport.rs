//! # Transport
//! The publish/subscribe seam between the pipeline stages. Production
//! deployments can put a durable broker behind this trait; the in-process
//! `MemoryTransport` is enough for a single node and for tests.

use std::{collections::HashMap, sync::Mutex};

use anyhow::Result;
use tokio::sync::broadcast;

/// Raw headlines published by the ingestion producer.
pub const TOPIC_RAW: &str = "news_raw";
/// Items that passed the enrichment stage (summary + embedding).
pub const TOPIC_ENRICHED: &str = "news_enriched";

/// A subscription to one topic. Records are JSON strings.
#[async_trait::async_trait]
pub trait RecordStream: Send {
    /// Next record in arrival order; `None` once the topic is closed.
    async fn next(&mut self) -> Option<String>;
}

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn publish(&self, topic: &str, record: &str) -> Result<()>;
    async fn subscribe(&self, topic: &str) -> Box<dyn RecordStream>;
}

/// In-process broker over tokio broadcast channels. At-least-once within the
/// process as long as subscribers keep up; a lagging subscriber skips the
/// overwritten records (logged), mirroring what a bounded broker buffer does.
pub struct MemoryTransport {
    topics: Mutex<HashMap<String, broadcast::Sender<String>>>,
    buffer: usize,
}

impl MemoryTransport {
    pub fn new(buffer: usize) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            buffer: buffer.max(1),
        }
    }

    fn sender_for(&self, topic: &str) -> broadcast::Sender<String> {
        let mut topics = self.topics.lock().expect("transport mutex poisoned");
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.buffer).0)
            .clone()
    }
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    async fn publish(&self, topic: &str, record: &str) -> Result<()> {
        let tx = self.sender_for(topic);
        // No subscriber yet means the record has nowhere to go; that is not
        // a publish failure from the producer's perspective.
        if tx.send(record.to_string()).is_err() {
            tracing::debug!(topic, "published with no subscribers");
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Box<dyn RecordStream> {
        let rx = self.sender_for(topic).subscribe();
        Box::new(MemoryStream { rx })
    }
}

struct MemoryStream {
    rx: broadcast::Receiver<String>,
}

#[async_trait::async_trait]
impl RecordStream for MemoryStream {
    async fn next(&mut self) -> Option<String> {
        loop {
            match self.rx.recv().await {
                Ok(record) => return Some(record),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber lagged; records skipped");
                    metrics::counter!("transport_lagged_total").increment(skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
