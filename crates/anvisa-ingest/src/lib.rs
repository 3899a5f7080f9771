//! Ingestion pipeline for the ANVISA open-data medicines registry.
//!
//! The upstream dataset is a large delimited export republished as a full
//! snapshot, with no stable text encoding. This crate turns it into rows
//! in a record store: encoding/delimiter resolution, row parsing, field
//! normalization, and transactional full-replace batch loading, reported
//! through a structured [`report::ImportRun`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use anvisa_ingest::config::ImportConfig;
//! use anvisa_ingest::pipeline::ImportPipeline;
//! use anvisa_ingest::store::PgRecordStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = PgRecordStore::connect("postgres://localhost/medicamentos").await?;
//!     let pipeline = ImportPipeline::new(ImportConfig::from_env()?, Arc::new(store));
//!     let run = pipeline.run(None).await;
//!     println!("{}", serde_json::to_string_pretty(&run)?);
//!     Ok(())
//! }
//! ```

pub mod analyze;
pub mod config;
pub mod encoding;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod store;

// Re-export the types callers touch most
pub use config::ImportConfig;
pub use error::{ImportError, Result};
pub use models::Medicamento;
pub use pipeline::ImportPipeline;
pub use report::{ImportRun, RunStatus};
