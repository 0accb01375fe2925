//! # Rolling Vector Index
//! Bounded in-memory store of enriched headlines plus their embeddings.
//! Single source of truth for "recent, embedded news": one writer (the index
//! builder), many concurrent readers (query tasks).
//!
//! All mutation happens under one mutex; `snapshot()` holds it only long
//! enough to copy `Arc` handles, so similarity scoring never blocks ingestion.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use crate::ingest::types::EnrichedItem;

/// An enriched item plus the insertion sequence number used for recency
/// ordering and eviction.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IndexEntry {
    /// Monotonic, assigned at first insertion; a refresh keeps the original.
    pub seq: u64,
    pub item: EnrichedItem,
}

/// Outcome of an upsert, for logging and tests.
#[derive(Debug)]
pub struct Upsert {
    pub seq: u64,
    /// True when an existing id was refreshed in place.
    pub refreshed: bool,
    /// Entry evicted to stay within capacity, if any.
    pub evicted: Option<Arc<IndexEntry>>,
}

#[derive(Debug)]
pub struct RollingIndex {
    inner: Mutex<Inner>,
    capacity: usize,
}

#[derive(Debug)]
struct Inner {
    /// Ascending by `seq`; refreshes keep their slot, so order is invariant.
    entries: VecDeque<Arc<IndexEntry>>,
    next_seq: u64,
}

impl RollingIndex {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: VecDeque::new(),
                next_seq: 1,
            }),
            capacity: capacity.max(1),
        }
    }

    /// Insert-or-replace by id.
    ///
    /// A known id is refreshed in place: content is replaced but the original
    /// sequence number (and thus its eviction rank) is kept, so republished
    /// items cannot thrash the FIFO order. A new id gets the next sequence
    /// number; when that pushes the index over capacity the oldest entry is
    /// evicted inside the same critical section, so readers never observe
    /// more than `capacity` entries.
    pub fn upsert(&self, item: EnrichedItem) -> Upsert {
        let mut guard = self.inner.lock().expect("index mutex poisoned");
        let inner = &mut *guard;

        if let Some(pos) = inner.entries.iter().position(|e| e.item.id == item.id) {
            let seq = inner.entries[pos].seq;
            inner.entries[pos] = Arc::new(IndexEntry { seq, item });
            return Upsert {
                seq,
                refreshed: true,
                evicted: None,
            };
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.push_back(Arc::new(IndexEntry { seq, item }));

        let evicted = if inner.entries.len() > self.capacity {
            inner.entries.pop_front()
        } else {
            None
        };

        Upsert {
            seq,
            refreshed: false,
            evicted,
        }
    }

    /// Remove and return the entry with the smallest sequence number.
    pub fn evict_oldest(&self) -> Option<Arc<IndexEntry>> {
        let mut guard = self.inner.lock().expect("index mutex poisoned");
        guard.entries.pop_front()
    }

    /// Consistent point-in-time copy, ascending by sequence number.
    ///
    /// Copies `Arc` handles only; the lock is released before the caller does
    /// any scoring. An entry evicted after the snapshot stays alive until the
    /// last in-flight ranking drops it.
    pub fn snapshot(&self) -> Vec<Arc<IndexEntry>> {
        let guard = self.inner.lock().expect("index mutex poisoned");
        guard.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("index mutex poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
