//! Import pipeline orchestration
//!
//! Wires fetch → encoding resolution → parse → normalize → load into one
//! sequential pass and folds every outcome, fatal or not, into an
//! [`ImportRun`]. The pipeline value owns the single-run guard: the load
//! is destructive (full replace), so two concurrent runs against the same
//! destination would race on delete-all and interleave batches. A second
//! `run` call while one is active is rejected, not queued.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::ImportConfig;
use crate::encoding::EncodingResolver;
use crate::error::{ImportError, Result};
use crate::fetch::{SourceFetcher, SourceLocator};
use crate::loader::BatchLoader;
use crate::normalize::normalize;
use crate::parser;
use crate::report::ImportRun;
use crate::store::RecordStore;

pub struct ImportPipeline {
    config: ImportConfig,
    store: Arc<dyn RecordStore>,
    guard: Semaphore,
}

impl ImportPipeline {
    pub fn new(config: ImportConfig, store: Arc<dyn RecordStore>) -> Self {
        Self {
            config,
            store,
            guard: Semaphore::new(1),
        }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Run one import. `locator` falls back to the configured source URL.
    ///
    /// Never returns an error: fatal failures finalize the report as
    /// Aborted with partial counts, so the caller always gets a report in
    /// a final state.
    pub async fn run(&self, locator: Option<&str>) -> ImportRun {
        let locator = locator.unwrap_or(&self.config.source_url).to_string();
        let mut run = ImportRun::new(&locator, self.config.error_sample_limit);

        let _permit = match self.guard.try_acquire() {
            Ok(permit) => permit,
            Err(_) => {
                let err = ImportError::RunInProgress;
                warn!(locator = %locator, "import rejected: run already active");
                run.abort(&err);
                return run;
            },
        };

        info!(locator = %locator, batch_size = self.config.batch_size, "import started");
        match self.execute(&locator, &mut run).await {
            Ok(()) => {
                run.complete();
                info!(
                    total = run.total_rows,
                    imported = run.imported,
                    errors = run.errors,
                    encoding = run.encoding.as_deref().unwrap_or("?"),
                    "import completed"
                );
            },
            Err(err) => {
                error!(
                    locator = %locator,
                    error = %err,
                    imported = run.imported,
                    "import aborted"
                );
                run.abort(&err);
            },
        }
        run
    }

    async fn execute(&self, locator: &str, run: &mut ImportRun) -> Result<()> {
        run.mark_running();
        // The deadline covers the whole run: fetch through last commit.
        let deadline = Instant::now() + self.config.run_timeout();

        let fetcher = SourceFetcher::new(self.config.fetch.clone())?;
        let source = fetcher.fetch(&SourceLocator::parse(locator)).await?;
        run.source_sha256 = Some(source.sha256.clone());
        run.source_size_bytes = Some(source.size_bytes());

        let resolver = EncodingResolver::new(&self.config.encoding);
        let resolution = resolver.resolve(&source.bytes)?;
        info!(
            encoding = %resolution.encoding,
            confirmed = resolution.confirmed,
            delimiter = %resolution.delimiter,
            "source resolved"
        );
        if !resolution.confirmed {
            warn!(
                encoding = %resolution.encoding,
                "proceeding with unconfirmed encoding; imported text may be wrong"
            );
        }
        run.encoding = Some(resolution.encoding.clone());
        run.encoding_confirmed = resolution.confirmed;
        run.delimiter = Some(resolution.delimiter);

        let records = parser::parse(&resolution.text, resolution.delimiter)?;
        let normalized = records.map(|item| item.map(|raw| normalize(&raw)));

        BatchLoader::new(self.store.as_ref(), self.config.batch_size)
            .with_deadline(deadline)
            .load(normalized, run)
            .await
    }
}
