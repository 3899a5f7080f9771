//! Error taxonomy for the ingestion pipeline
//!
//! Row-level failures (`RowParse`) are folded into the run report and never
//! escape the pipeline. Everything else is fatal: the run aborts, already
//! committed batches stay persisted, and the caller receives an Aborted
//! report rather than an opaque error.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ImportError>;

#[derive(Error, Debug)]
pub enum ImportError {
    /// Fetch failed: missing file, DNS/connect failure, or non-success HTTP
    /// status after all retry attempts.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// No candidate encoding produced any decodable output.
    #[error("encoding unresolved: no candidate decoded the source ({tried} tried)")]
    EncodingUnresolved { tried: usize },

    /// A single row could not be read; recovered locally, counted, skipped.
    #[error("row parse error at line {line}: {message}")]
    RowParse { line: u64, message: String },

    /// A batch failed to persist. Prior batches are retained.
    #[error("batch commit failed at batch {batch}: {message}")]
    BatchCommit { batch: usize, message: String },

    /// Caller-imposed deadline exceeded; same retention semantics as a
    /// failed batch commit.
    #[error("run deadline exceeded after {committed} committed batches")]
    Timeout { committed: usize },

    /// A destructive run is already active against this destination.
    #[error("an import run is already in progress")]
    RunInProgress,

    /// Invalid configuration detected before the run started.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ImportError {
    /// Whether this error aborts the run (everything except row-level ones).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ImportError::RowParse { .. })
    }

    /// Short machine-readable kind for the run report.
    pub fn kind(&self) -> &'static str {
        match self {
            ImportError::SourceUnavailable(_) => "source_unavailable",
            ImportError::EncodingUnresolved { .. } => "encoding_unresolved",
            ImportError::RowParse { .. } => "row_parse",
            ImportError::BatchCommit { .. } => "batch_commit",
            ImportError::Timeout { .. } => "timeout",
            ImportError::RunInProgress => "run_in_progress",
            ImportError::Config(_) => "config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_row_parse_is_recoverable() {
        let row = ImportError::RowParse {
            line: 7,
            message: "bad quoting".into(),
        };
        assert!(!row.is_fatal());

        let fatal = [
            ImportError::SourceUnavailable("gone".into()),
            ImportError::EncodingUnresolved { tried: 3 },
            ImportError::BatchCommit {
                batch: 2,
                message: "io".into(),
            },
            ImportError::Timeout { committed: 1 },
            ImportError::RunInProgress,
        ];
        assert!(fatal.iter().all(ImportError::is_fatal));
    }
}
