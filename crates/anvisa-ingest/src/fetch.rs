//! Source fetching
//!
//! Obtains the raw bytes of the dataset from a local path or an HTTP(S)
//! URL. No parsing happens here; the payload is handed to the encoding
//! resolver untouched. Remote fetches are bounded: per-request timeout and
//! a fixed attempt budget, retrying transport errors and 5xx only.

use std::path::PathBuf;

use anvisa_common::checksum::sha256_hex;
use tracing::{debug, info, warn};

use crate::config::FetchConfig;
use crate::error::{ImportError, Result};

/// Where the dataset comes from: a file on disk or a remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    Path(PathBuf),
    Url(String),
}

impl SourceLocator {
    /// Interpret a raw locator string. Anything that does not look like an
    /// HTTP(S) URL is treated as a filesystem path.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            SourceLocator::Url(trimmed.to_string())
        } else {
            SourceLocator::Path(PathBuf::from(trimmed))
        }
    }
}

impl std::fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceLocator::Path(path) => write!(f, "{}", path.display()),
            SourceLocator::Url(url) => write!(f, "{}", url),
        }
    }
}

/// Raw payload plus provenance for the run report.
#[derive(Debug, Clone)]
pub struct FetchedSource {
    pub locator: String,
    pub bytes: Vec<u8>,
    pub sha256: String,
}

impl FetchedSource {
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Fetches source payloads under the configured bounds.
pub struct SourceFetcher {
    config: FetchConfig,
    client: reqwest::Client,
}

impl SourceFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ImportError::Config(format!("http client: {e}")))?;
        Ok(Self { config, client })
    }

    pub async fn fetch(&self, locator: &SourceLocator) -> Result<FetchedSource> {
        let bytes = match locator {
            SourceLocator::Path(path) => tokio::fs::read(path).await.map_err(|e| {
                ImportError::SourceUnavailable(format!("{}: {e}", path.display()))
            })?,
            SourceLocator::Url(url) => self.fetch_url(url).await?,
        };

        let sha256 = sha256_hex(&bytes);
        info!(
            locator = %locator,
            size_bytes = bytes.len(),
            sha256 = %sha256,
            "source fetched"
        );

        Ok(FetchedSource {
            locator: locator.to_string(),
            bytes,
            sha256,
        })
    }

    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>> {
        let mut last_error = String::new();

        for attempt in 1..=self.config.max_attempts {
            debug!(url = %url, attempt, "fetching source");
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .bytes()
                            .await
                            .map(|b| b.to_vec())
                            .map_err(|e| {
                                ImportError::SourceUnavailable(format!("{url}: read body: {e}"))
                            });
                    }
                    if status.is_client_error() {
                        // 4xx will not get better on retry
                        return Err(ImportError::SourceUnavailable(format!(
                            "{url}: HTTP {status}"
                        )));
                    }
                    last_error = format!("HTTP {status}");
                },
                Err(e) => {
                    last_error = e.to_string();
                },
            }

            if attempt < self.config.max_attempts {
                warn!(url = %url, attempt, error = %last_error, "fetch attempt failed, retrying");
                tokio::time::sleep(self.config.retry_delay()).await;
            }
        }

        Err(ImportError::SourceUnavailable(format!(
            "{url}: {last_error} (after {} attempts)",
            self.config.max_attempts
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_parse_url() {
        assert_eq!(
            SourceLocator::parse("https://dados.anvisa.gov.br/dados/x.csv"),
            SourceLocator::Url("https://dados.anvisa.gov.br/dados/x.csv".to_string())
        );
    }

    #[test]
    fn test_locator_parse_path() {
        assert_eq!(
            SourceLocator::parse("/tmp/DADOS_ABERTOS_MEDICAMENTOS.csv"),
            SourceLocator::Path(PathBuf::from("/tmp/DADOS_ABERTOS_MEDICAMENTOS.csv"))
        );
        // relative paths too
        assert_eq!(
            SourceLocator::parse("data/export.csv"),
            SourceLocator::Path(PathBuf::from("data/export.csv"))
        );
    }

    #[tokio::test]
    async fn test_fetch_missing_file_is_source_unavailable() {
        let fetcher = SourceFetcher::new(FetchConfig::default()).unwrap();
        let locator = SourceLocator::Path(PathBuf::from("/nonexistent/file.csv"));
        let err = fetcher.fetch(&locator).await.unwrap_err();
        assert!(matches!(err, ImportError::SourceUnavailable(_)));
    }
}
