// src/lib.rs
// Public library surface for integration tests (and the binary).

pub mod api;
pub mod builder;
pub mod config;
pub mod dedup;
pub mod embed;
pub mod enrich;
pub mod index;
pub mod ingest;
pub mod metrics;
pub mod query;
pub mod stats;
pub mod synth;
pub mod transport;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::index::RollingIndex;
pub use crate::query::{AskError, AskResponse, QueryEngine};
