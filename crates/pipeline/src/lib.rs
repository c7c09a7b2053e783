//! Incremental materialization pipeline for the Hyperliquid stats cache.
//!
//! This crate provides:
//! - Object-store key construction and rate-limited partition fetching
//! - Partition decompression and decoding (typed CSV, dynamic CSV, L2 JSON)
//! - Date-range resolution against the cache high-water mark
//! - Per-source aggregation strategies and the order-book slippage engine
//! - The run orchestrator tying fetch, load, aggregate, and write together

pub mod aggregate;
pub mod decode;
pub mod locator;
pub mod meta;
pub mod models;
pub mod orchestrator;
pub mod resolver;
pub mod slippage;
pub mod store;

// Re-export commonly used types
pub use meta::InfoClient;
pub use orchestrator::PipelineOrchestrator;
pub use resolver::resolve_dates;
pub use store::{HttpObjectStore, ObjectStore};
