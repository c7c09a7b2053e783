//! Relational storage for the Hyperliquid stats pipeline.
//!
//! This crate provides:
//! - Database client for `PostgreSQL`
//! - Idempotent cache-table writer with a schema-drift rewrite fallback
//! - Guarded base-table loader for raw partition rows
//! - Base-vs-cache consistency checking

pub mod cache_writer;
pub mod consistency;
pub mod database;
pub mod raw_loader;
mod writer;

// Re-export commonly used types
pub use cache_writer::CacheWriter;
pub use consistency::{divergence_message, ConsistencyChecker};
pub use database::DatabaseClient;
pub use raw_loader::RawLoader;
