// tests/index_invariants.rs
//
// Capacity, FIFO eviction, and refresh semantics of the rolling index over
// longer upsert sequences than the unit tests exercise.

use newsflow::index::RollingIndex;
use newsflow::ingest::types::{EnrichedItem, NewsItem};

fn enriched(id: &str, embedding: Vec<f32>) -> EnrichedItem {
    EnrichedItem::from_parts(
        NewsItem {
            id: id.to_string(),
            title: format!("title {id}"),
            body: format!("body {id}"),
            published_at: 0,
            source_url: format!("https://example.com/{id}"),
        },
        format!("summary {id}"),
        embedding,
        0,
    )
}

#[test]
fn capacity_invariant_holds_for_any_upsert_sequence() {
    let idx = RollingIndex::with_capacity(10);
    // Mix of fresh ids and refreshes of earlier ids.
    for i in 0..200 {
        let id = if i % 3 == 0 {
            format!("id{}", i / 2) // revisits earlier ids
        } else {
            format!("id{i}")
        };
        idx.upsert(enriched(&id, vec![i as f32]));
        assert!(idx.len() <= 10, "capacity exceeded after upsert {i}");
    }
    assert_eq!(idx.len(), 10);
}

#[test]
fn n_plus_one_distinct_inserts_evict_only_the_smallest_seq() {
    let n = 5;
    let idx = RollingIndex::with_capacity(n);
    for i in 0..=n {
        idx.upsert(enriched(&format!("id{i}"), vec![1.0]));
    }
    let snap = idx.snapshot();
    let ids: Vec<_> = snap.iter().map(|e| e.item.id.as_str()).collect();
    assert!(!ids.contains(&"id0"), "oldest entry must be gone");
    for i in 1..=n {
        assert!(ids.contains(&format!("id{i}").as_str()), "id{i} must remain");
    }
    let seqs: Vec<_> = snap.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, (2..=(n as u64 + 1)).collect::<Vec<_>>());
}

#[test]
fn refresh_updates_content_without_evicting_anyone() {
    let idx = RollingIndex::with_capacity(3);
    for id in ["a", "b", "c"] {
        idx.upsert(enriched(id, vec![0.0]));
    }

    let out = idx.upsert(enriched("a", vec![7.0]));
    assert!(out.refreshed);
    assert!(out.evicted.is_none());
    assert_eq!(idx.len(), 3);

    let snap = idx.snapshot();
    let a = snap.iter().find(|e| e.item.id == "a").unwrap();
    assert_eq!(a.item.embedding, vec![7.0]);
    assert_eq!(a.seq, 1, "refresh must keep the original seq");

    // A subsequent fresh insert still evicts "a" first: refresh did not
    // improve its recency rank.
    let out = idx.upsert(enriched("d", vec![0.0]));
    assert_eq!(out.evicted.unwrap().item.id, "a");
}

#[test]
fn snapshot_is_isolated_from_later_mutation() {
    let idx = RollingIndex::with_capacity(2);
    idx.upsert(enriched("a", vec![1.0]));
    idx.upsert(enriched("b", vec![1.0]));

    let snap = idx.snapshot();
    idx.upsert(enriched("c", vec![1.0])); // evicts "a"

    // The snapshot still holds a consistent pre-mutation view.
    let ids: Vec<_> = snap.iter().map(|e| e.item.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);

    let now: Vec<_> = idx.snapshot().iter().map(|e| e.item.id.clone()).collect();
    assert_eq!(now, vec!["b", "c"]);
}
