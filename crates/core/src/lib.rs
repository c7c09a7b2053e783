//! Core types for the Hyperliquid stats pipeline.
//!
//! This crate provides:
//! - Application configuration and the figment-based loader
//! - The `Source` registry mapping each dump family to its tables and keys
//! - Table schema descriptions and dynamically typed row sets
//! - The pipeline error taxonomy
//! - The best-effort alert sink contract and implementations

pub mod alert;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod schema;
pub mod source;

// Re-export commonly used types
pub use alert::{sink_from_config, AlertSink, LogAlertSink, SlackWebhookSink};
pub use config::{AlertConfig, AppConfig, DatabaseConfig, ObjectStoreConfig, PipelineConfig};
pub use config_loader::ConfigLoader;
pub use error::PipelineError;
pub use schema::{Column, ColumnType, RowSet, SqlValue, TableSchema};
pub use source::Source;
