//! Shared utilities for the ANVISA medicines ingestion workspace.
//!
//! This crate provides the pieces every workspace member needs:
//!
//! - **Error Handling**: the common error type and result alias
//! - **Logging**: tracing subscriber setup driven by environment or code
//! - **Checksums**: content digests for fetched payloads

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{AnvisaError, Result};
