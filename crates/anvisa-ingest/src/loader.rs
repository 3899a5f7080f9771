//! Batch loading
//!
//! Full-replace load: the previous snapshot is deleted up front (the
//! source is a complete export, so merging would only preserve stale
//! rows), then normalized records are committed in fixed-size atomic
//! batches. Row-level errors are counted and skipped; a failed batch
//! commit aborts the rest of the run while keeping every batch already
//! committed. The caller's deadline is checked immediately before each
//! commit, so an expired run can never issue another one.

use std::time::Instant;

use tracing::{debug, info};

use crate::error::{ImportError, Result};
use crate::models::Medicamento;
use crate::report::ImportRun;
use crate::store::RecordStore;

pub struct BatchLoader<'s> {
    store: &'s dyn RecordStore,
    batch_size: usize,
    deadline: Option<Instant>,
}

impl<'s> BatchLoader<'s> {
    pub fn new(store: &'s dyn RecordStore, batch_size: usize) -> Self {
        Self {
            store,
            batch_size,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Consume the record sequence and perform the load, accumulating
    /// counts into `run`.
    pub async fn load<I>(&self, records: I, run: &mut ImportRun) -> Result<()>
    where
        I: Iterator<Item = Result<Medicamento>>,
    {
        let removed = self.store.delete_all().await.map_err(|e| {
            ImportError::BatchCommit {
                batch: 0,
                message: format!("clear destination: {e:#}"),
            }
        })?;
        if removed > 0 {
            info!(removed, "cleared previous snapshot");
        }

        let mut batch = Vec::with_capacity(self.batch_size);
        let mut committed = 0usize;

        for item in records {
            run.total_rows += 1;
            match item {
                Ok(record) => {
                    batch.push(record);
                    if batch.len() >= self.batch_size {
                        self.commit(&mut batch, &mut committed, run).await?;
                    }
                },
                Err(err) => {
                    debug!(error = %err, "row skipped");
                    run.record_row_error(err.to_string());
                },
            }
        }

        if !batch.is_empty() {
            self.commit(&mut batch, &mut committed, run).await?;
        }

        info!(
            total = run.total_rows,
            imported = run.imported,
            errors = run.errors,
            batches = committed,
            "load finished"
        );
        Ok(())
    }

    async fn commit(
        &self,
        batch: &mut Vec<Medicamento>,
        committed: &mut usize,
        run: &mut ImportRun,
    ) -> Result<()> {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(ImportError::Timeout {
                    committed: *committed,
                });
            }
        }

        self.store
            .insert_batch(batch)
            .await
            .map_err(|e| ImportError::BatchCommit {
                batch: *committed + 1,
                message: format!("{e:#}"),
            })?;

        run.imported += batch.len() as u64;
        *committed += 1;
        debug!(batch = *committed, rows = batch.len(), "batch committed");
        batch.clear();
        Ok(())
    }
}
