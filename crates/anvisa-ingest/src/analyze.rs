//! Operator diagnostics
//!
//! Two read-only checks that exist because encoding corruption shipped to
//! production more than once: `analyze` probes a source before anyone
//! imports it, and `verify` scans rows already in the store for the
//! characteristic damage (replacement characters, Portuguese words with
//! their accented letter eaten).

use serde::Serialize;
use tracing::{info, warn};

use crate::config::ImportConfig;
use crate::encoding::{CandidateProbe, EncodingResolver};
use crate::error::Result;
use crate::fetch::{SourceFetcher, SourceLocator};
use crate::store::RecordStore;

/// Corrupted stems left behind when an accented letter is dropped by a
/// wrong decode, as observed in damaged production rows.
const MOJIBAKE_STEMS: [&str; 4] = ["INDSTRIA", "FARMACUTICA", "VLIDO", "GENRICO"];

/// Result of probing a source without importing it.
#[derive(Debug, Serialize)]
pub struct SourceAnalysis {
    pub locator: String,
    pub size_bytes: u64,
    pub sha256: String,
    /// Per-candidate verdicts, in configured order
    pub candidates: Vec<CandidateProbe>,
    /// What a real import would choose
    pub chosen_encoding: Option<String>,
    pub chosen_confirmed: bool,
    pub chosen_delimiter: Option<char>,
}

/// Fetch and probe a source: per-candidate decode verdicts plus the choice
/// an import would make. Touches no store.
pub async fn analyze_source(config: &ImportConfig, locator: &str) -> Result<SourceAnalysis> {
    let fetcher = SourceFetcher::new(config.fetch.clone())?;
    let source = fetcher.fetch(&SourceLocator::parse(locator)).await?;

    let resolver = EncodingResolver::new(&config.encoding);
    let candidates = resolver.probe(&source.bytes);
    let resolution = resolver.resolve(&source.bytes).ok();

    Ok(SourceAnalysis {
        locator: source.locator.clone(),
        size_bytes: source.size_bytes(),
        sha256: source.sha256.clone(),
        candidates,
        chosen_encoding: resolution.as_ref().map(|r| r.encoding.clone()),
        chosen_confirmed: resolution.as_ref().map(|r| r.confirmed).unwrap_or(false),
        chosen_delimiter: resolution.as_ref().map(|r| r.delimiter),
    })
}

/// Result of scanning stored rows for encoding damage.
#[derive(Debug, Serialize)]
pub struct VerifyReport {
    pub checked: usize,
    pub suspects: usize,
    /// First few suspect field values
    pub samples: Vec<String>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.suspects == 0
    }
}

/// Whether one field value looks like it went through a wrong decode.
fn is_suspect(value: &str) -> bool {
    value.contains(char::REPLACEMENT_CHARACTER)
        || MOJIBAKE_STEMS.iter().any(|stem| value.contains(stem))
}

/// Sample stored rows and count fields showing encoding damage. A dirty
/// result means the snapshot should be re-imported from a correctly
/// resolved source.
pub async fn verify_store(store: &dyn RecordStore, limit: i64) -> anyhow::Result<VerifyReport> {
    let rows = store.sample(limit).await?;
    let mut report = VerifyReport {
        checked: rows.len(),
        suspects: 0,
        samples: Vec::new(),
    };

    for row in &rows {
        for field in row.text_fields().into_iter().flatten() {
            if is_suspect(field) {
                report.suspects += 1;
                if report.samples.len() < 5 {
                    report.samples.push(field.clone());
                }
                break;
            }
        }
    }

    if report.is_clean() {
        info!(checked = report.checked, "no encoding damage found in sample");
    } else {
        warn!(
            checked = report.checked,
            suspects = report.suspects,
            "stored rows show encoding damage; re-import recommended"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Medicamento;
    use crate::store::MemoryRecordStore;

    fn record(empresa: &str) -> Medicamento {
        Medicamento {
            tipo_produto: Some("Medicamento".to_string()),
            nome_produto: Some("Paracetamol".to_string()),
            data_finalizacao_processo: None,
            categoria_regulatoria: None,
            numero_registro_produto: None,
            data_vencimento_registro: None,
            numero_processo: None,
            classe_terapeutica: None,
            empresa_detentora_registro: Some(empresa.to_string()),
            situacao_registro: None,
            principio_ativo: None,
        }
    }

    #[test]
    fn test_suspect_detection() {
        assert!(is_suspect("INDSTRIA FARMACUTICA LTDA"));
        assert!(is_suspect("texto com \u{fffd} perdido"));
        assert!(!is_suspect("INDÚSTRIA FARMACÊUTICA LTDA"));
    }

    #[tokio::test]
    async fn test_verify_clean_store() {
        let store = MemoryRecordStore::new();
        store
            .insert_batch(&[record("INDÚSTRIA QUÍMICA")])
            .await
            .unwrap();
        let report = verify_store(&store, 100).await.unwrap();
        assert_eq!(report.checked, 1);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_verify_flags_damaged_rows() {
        let store = MemoryRecordStore::new();
        store
            .insert_batch(&[record("INDSTRIA FARMACUTICA"), record("ACME LTDA")])
            .await
            .unwrap();
        let report = verify_store(&store, 100).await.unwrap();
        assert_eq!(report.checked, 2);
        assert_eq!(report.suspects, 1);
        assert_eq!(report.samples.len(), 1);
    }
}
