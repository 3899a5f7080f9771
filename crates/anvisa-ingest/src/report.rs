//! Run reporting
//!
//! One [`ImportRun`] per ingestion attempt. It is created Pending, moves to
//! Running when the fetch starts, and ends Completed or Aborted — never
//! anything else. Counts and the first few error messages accumulate as the
//! run progresses; once finalized the value is treated as immutable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ImportError;

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Aborted,
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Aborted => "aborted",
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Aborted)
    }
}

/// Structured outcome of one ingestion attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRun {
    pub locator: String,
    pub status: RunStatus,

    /// Resolved encoding label, once known
    pub encoding: Option<String>,
    /// Whether a marker character confirmed the encoding
    pub encoding_confirmed: bool,
    /// Resolved field delimiter, once known
    pub delimiter: Option<char>,

    /// SHA-256 of the fetched payload
    pub source_sha256: Option<String>,
    pub source_size_bytes: Option<u64>,

    /// Rows seen by the parser
    pub total_rows: u64,
    /// Rows persisted through committed batches
    pub imported: u64,
    /// Rows skipped by row-level errors
    pub errors: u64,
    /// First few error messages; the rest are counted only
    pub error_samples: Vec<String>,
    #[serde(skip)]
    error_sample_limit: usize,

    /// Machine-readable failure kind when aborted
    pub failure: Option<String>,
    /// Human-readable failure detail when aborted
    pub failure_detail: Option<String>,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ImportRun {
    pub fn new(locator: impl Into<String>, error_sample_limit: usize) -> Self {
        Self {
            locator: locator.into(),
            status: RunStatus::Pending,
            encoding: None,
            encoding_confirmed: false,
            delimiter: None,
            source_sha256: None,
            source_size_bytes: None,
            total_rows: 0,
            imported: 0,
            errors: 0,
            error_samples: Vec::new(),
            error_sample_limit,
            failure: None,
            failure_detail: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = RunStatus::Running;
    }

    /// Record a row-level error: counted always, retained up to the limit.
    pub fn record_row_error(&mut self, message: impl Into<String>) {
        self.errors += 1;
        if self.error_samples.len() < self.error_sample_limit {
            self.error_samples.push(message.into());
        }
    }

    pub fn complete(&mut self) {
        self.status = RunStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub fn abort(&mut self, error: &ImportError) {
        self.status = RunStatus::Aborted;
        self.failure = Some(error.kind().to_string());
        self.failure_detail = Some(error.to_string());
        self.finished_at = Some(Utc::now());
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}
