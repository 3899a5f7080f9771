//! HTTP fetch behavior: bounded retries, no retry on client errors, and a
//! whole import running against a mocked remote source.

use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use anvisa_ingest::config::{FetchConfig, ImportConfig};
use anvisa_ingest::error::ImportError;
use anvisa_ingest::fetch::{SourceFetcher, SourceLocator};
use anvisa_ingest::pipeline::ImportPipeline;
use anvisa_ingest::report::RunStatus;
use anvisa_ingest::store::{MemoryRecordStore, RecordStore};

fn fast_fetch_config() -> FetchConfig {
    FetchConfig {
        retry_delay_secs: 0,
        ..FetchConfig::default()
    }
}

#[tokio::test]
async fn test_fetch_url_returns_payload_and_digest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dados/DADOS_ABERTOS_MEDICAMENTOS.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"TIPO_PRODUTO\nMedicamento\n".to_vec()))
        .mount(&server)
        .await;

    let fetcher = SourceFetcher::new(fast_fetch_config()).unwrap();
    let url = format!("{}/dados/DADOS_ABERTOS_MEDICAMENTOS.csv", server.uri());
    let source = fetcher.fetch(&SourceLocator::parse(&url)).await.unwrap();

    assert_eq!(source.bytes, b"TIPO_PRODUTO\nMedicamento\n");
    assert_eq!(source.sha256.len(), 64);
}

#[tokio::test]
async fn test_transient_server_error_is_retried() {
    let server = MockServer::start().await;
    // first attempt fails, the retry succeeds
    Mock::given(method("GET"))
        .and(path("/export.csv"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/export.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
        .mount(&server)
        .await;

    let fetcher = SourceFetcher::new(fast_fetch_config()).unwrap();
    let url = format!("{}/export.csv", server.uri());
    let source = fetcher.fetch(&SourceLocator::parse(&url)).await.unwrap();
    assert_eq!(source.bytes, b"ok");
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.csv"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = SourceFetcher::new(fast_fetch_config()).unwrap();
    let url = format!("{}/gone.csv", server.uri());
    let err = fetcher.fetch(&SourceLocator::parse(&url)).await.unwrap_err();
    assert!(matches!(err, ImportError::SourceUnavailable(_)));
    server.verify().await;
}

#[tokio::test]
async fn test_retry_budget_is_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down.csv"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let config = FetchConfig {
        max_attempts: 3,
        retry_delay_secs: 0,
        ..FetchConfig::default()
    };
    let fetcher = SourceFetcher::new(config).unwrap();
    let url = format!("{}/down.csv", server.uri());
    let err = fetcher.fetch(&SourceLocator::parse(&url)).await.unwrap_err();
    assert!(matches!(err, ImportError::SourceUnavailable(_)));
    server.verify().await;
}

#[tokio::test]
async fn test_import_from_remote_source() {
    let server = MockServer::start().await;
    let mut body = Vec::new();
    body.extend_from_slice(b"TIPO_PRODUTO;NOME_PRODUTO;SITUACAO_REGISTRO\n");
    // "VÁLIDO" in windows-1252 (0xC1) so the encoding gets confirmed
    body.extend_from_slice(b"Medicamento;Dipirona;V\xC1LIDO\n");
    body.extend_from_slice(b"Medicamento;Paracetamol;V\xC1LIDO\n");
    Mock::given(method("GET"))
        .and(path("/dados.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryRecordStore::new());
    let mut config = ImportConfig::default();
    config.fetch = fast_fetch_config();
    let pipeline = ImportPipeline::new(config, store.clone());

    let url = format!("{}/dados.csv", server.uri());
    let run = pipeline.run(Some(&url)).await;

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.imported, 2);
    assert!(run.encoding_confirmed);
    assert_eq!(store.count().await.unwrap(), 2);
    assert_eq!(
        store.rows()[0].situacao_registro.as_deref(),
        Some("VÁLIDO")
    );
}
