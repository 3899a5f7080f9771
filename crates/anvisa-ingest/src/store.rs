//! Record store boundary
//!
//! The pipeline writes through the narrow [`RecordStore`] contract and
//! never reads rows back mid-run. [`PgRecordStore`] is the production
//! implementation over Postgres; [`MemoryRecordStore`] backs tests and
//! keeps store-dependent logic testable without a database.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::{debug, info};

use crate::models::Medicamento;

/// Rows per INSERT statement, bounded by the Postgres bind-parameter limit
/// (11 binds per row).
const MAX_INSERT_CHUNK: usize = 1000;

/// Destination of the load. `insert_batch` must be atomic: a batch is
/// either entirely persisted or not at all.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist one batch atomically.
    async fn insert_batch(&self, records: &[Medicamento]) -> Result<()>;

    /// Remove every stored row in a single transaction; returns the number
    /// of rows removed.
    async fn delete_all(&self) -> Result<u64>;

    /// Current row count.
    async fn count(&self) -> Result<i64>;

    /// A sample of stored rows for post-run diagnostics. Never called by
    /// the pipeline itself.
    async fn sample(&self, limit: i64) -> Result<Vec<Medicamento>>;
}

/// Postgres-backed record store over the `medicamentos` table.
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Create the destination table when missing. Shape mirrors the
    /// original registry schema.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS medicamentos (
                id BIGSERIAL PRIMARY KEY,
                tipo_produto VARCHAR(100),
                nome_produto VARCHAR(500),
                data_finalizacao_processo DATE,
                categoria_regulatoria VARCHAR(100),
                numero_registro_produto VARCHAR(50),
                data_vencimento_registro DATE,
                numero_processo VARCHAR(100),
                classe_terapeutica VARCHAR(500),
                empresa_detentora_registro TEXT,
                situacao_registro VARCHAR(100),
                principio_ativo TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to ensure medicamentos schema")?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert_batch(&self, records: &[Medicamento]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        for chunk in records.chunks(MAX_INSERT_CHUNK) {
            let mut query_builder = sqlx::QueryBuilder::new(
                "INSERT INTO medicamentos (tipo_produto, nome_produto, \
                 data_finalizacao_processo, categoria_regulatoria, \
                 numero_registro_produto, data_vencimento_registro, \
                 numero_processo, classe_terapeutica, \
                 empresa_detentora_registro, situacao_registro, principio_ativo) ",
            );

            query_builder.push_values(chunk, |mut b, record| {
                b.push_bind(&record.tipo_produto)
                    .push_bind(&record.nome_produto)
                    .push_bind(record.data_finalizacao_processo)
                    .push_bind(&record.categoria_regulatoria)
                    .push_bind(&record.numero_registro_produto)
                    .push_bind(record.data_vencimento_registro)
                    .push_bind(&record.numero_processo)
                    .push_bind(&record.classe_terapeutica)
                    .push_bind(&record.empresa_detentora_registro)
                    .push_bind(&record.situacao_registro)
                    .push_bind(&record.principio_ativo);
            });

            query_builder
                .build()
                .execute(&mut *tx)
                .await
                .context("Failed to insert batch chunk")?;
        }

        tx.commit().await.context("Failed to commit batch")?;
        debug!(rows = records.len(), "batch committed");
        Ok(())
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM medicamentos")
            .execute(&self.pool)
            .await
            .context("Failed to clear medicamentos")?;
        info!(rows = result.rows_affected(), "cleared existing rows");
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM medicamentos")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count medicamentos")?;
        Ok(count)
    }

    async fn sample(&self, limit: i64) -> Result<Vec<Medicamento>> {
        let rows = sqlx::query_as::<_, Medicamento>(
            "SELECT tipo_produto, nome_produto, data_finalizacao_processo, \
             categoria_regulatoria, numero_registro_produto, \
             data_vencimento_registro, numero_processo, classe_terapeutica, \
             empresa_detentora_registro, situacao_registro, principio_ativo \
             FROM medicamentos ORDER BY id LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to sample medicamentos")?;
        Ok(rows)
    }
}

/// In-memory store for tests.
///
/// `fail_after_batches` injects a commit failure on the Nth insert_batch
/// call (0-based), which is how batch-abort semantics get exercised
/// without a database.
#[derive(Default)]
pub struct MemoryRecordStore {
    rows: Mutex<Vec<Medicamento>>,
    batches: AtomicUsize,
    fail_after_batches: Option<usize>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_after(batches: usize) -> Self {
        Self {
            fail_after_batches: Some(batches),
            ..Self::default()
        }
    }

    /// Number of insert_batch calls observed.
    pub fn batches_committed(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn rows(&self) -> Vec<Medicamento> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_batch(&self, records: &[Medicamento]) -> Result<()> {
        let committed = self.batches.load(Ordering::SeqCst);
        if self.fail_after_batches == Some(committed) {
            anyhow::bail!("injected commit failure at batch {committed}");
        }
        self.rows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(records);
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let removed = rows.len() as u64;
        rows.clear();
        Ok(removed)
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.rows.lock().unwrap_or_else(|e| e.into_inner()).len() as i64)
    }

    async fn sample(&self, limit: i64) -> Result<Vec<Medicamento>> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows.iter().take(limit as usize).cloned().collect())
    }
}
