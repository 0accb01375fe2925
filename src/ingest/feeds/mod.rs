// src/ingest/feeds/mod.rs
pub mod newsapi;
