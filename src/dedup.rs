//! # Deduplicator
//! Suppresses re-ingestion of headlines already seen within a retention
//! window. Bounded: at most `capacity` ids are remembered, oldest first out,
//! so memory cannot grow with a chatty feed.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// Thread-safe bounded map of recently seen item ids.
#[derive(Debug)]
pub struct Deduplicator {
    inner: Mutex<Inner>,
    retention: Duration,
    capacity: usize,
}

#[derive(Debug)]
struct Inner {
    /// id -> unix seconds of first sighting.
    seen: HashMap<String, u64>,
    /// Insertion order, oldest at the front.
    order: VecDeque<String>,
}

impl Deduplicator {
    pub fn new(retention: Duration, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                seen: HashMap::new(),
                order: VecDeque::new(),
            }),
            retention,
            capacity: capacity.max(1),
        }
    }

    /// Returns `true` the first time an id is seen, `false` for repeats,
    /// until the id ages out of the retention window. If `ts_unix` is `None`,
    /// current time is used.
    ///
    /// A duplicate sighting does not extend the window; the id re-qualifies
    /// once `retention` has elapsed since its first sighting.
    pub fn observe(&self, id: &str, ts_unix: Option<u64>) -> bool {
        let now = ts_unix.unwrap_or_else(now_unix);
        let cutoff = now.saturating_sub(self.retention.as_secs());

        let mut guard = self.inner.lock().expect("dedup mutex poisoned");
        let inner = &mut *guard;

        // Age out expired ids from the front.
        loop {
            let expired = match inner.order.front() {
                Some(front) => inner.seen.get(front).map(|&t| t < cutoff).unwrap_or(true),
                None => break,
            };
            if !expired {
                break;
            }
            if let Some(front) = inner.order.pop_front() {
                inner.seen.remove(&front);
            }
        }

        if inner.seen.contains_key(id) {
            return false;
        }

        inner.seen.insert(id.to_string(), now);
        inner.order.push_back(id.to_string());

        // Hard bound independent of the window.
        while inner.order.len() > self.capacity {
            if let Some(front) = inner.order.pop_front() {
                inner.seen.remove(&front);
            }
        }

        true
    }

    /// Number of ids currently tracked (diagnostics only).
    pub fn len(&self) -> usize {
        self.inner.lock().expect("dedup mutex poisoned").seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Current UNIX time in seconds.
fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}
