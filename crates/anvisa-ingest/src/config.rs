//! Ingestion configuration
//!
//! Env-var driven, with defaults matching the published ANVISA dataset:
//! Latin-1 family encodings carrying Portuguese text, semicolon delimited,
//! refreshed as a full snapshot.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ImportError;

/// Default source location of the open-data medicines export.
pub const DEFAULT_SOURCE_URL: &str =
    "https://dados.anvisa.gov.br/dados/DADOS_ABERTOS_MEDICAMENTOS.csv";

/// Encoding and delimiter resolution settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncodingConfig {
    /// Candidate encoding labels, tried in order. Labels are resolved via
    /// the WHATWG registry ("iso-8859-1" therefore maps to windows-1252,
    /// which is what the upstream exporter actually emits).
    #[serde(default = "default_candidates")]
    pub candidates: Vec<String>,

    /// Characters expected in correctly decoded text. One hit in the sample
    /// window confirms a candidate; several encodings decode this dataset
    /// without error but map bytes to the wrong characters.
    #[serde(default = "default_markers")]
    pub markers: Vec<char>,

    /// Delimiter used when it appears in the sniff window.
    #[serde(default = "default_preferred_delimiter")]
    pub preferred_delimiter: char,

    /// Delimiter assumed otherwise.
    #[serde(default = "default_fallback_delimiter")]
    pub fallback_delimiter: char,

    /// Chars of decoded text inspected for the delimiter.
    #[serde(default = "default_sniff_window")]
    pub sniff_window: usize,

    /// Chars of decoded text inspected for marker characters.
    #[serde(default = "default_marker_window")]
    pub marker_window: usize,
}

fn default_candidates() -> Vec<String> {
    vec![
        "iso-8859-1".to_string(),
        "windows-1252".to_string(),
        "utf-8".to_string(),
    ]
}

fn default_markers() -> Vec<char> {
    "ãçéêôõáíóúâàüÃÇÉÊÔÕÁÍÓÚÂÀÜ".chars().collect()
}

fn default_preferred_delimiter() -> char {
    ';'
}

fn default_fallback_delimiter() -> char {
    ','
}

fn default_sniff_window() -> usize {
    1024
}

fn default_marker_window() -> usize {
    65536
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            candidates: default_candidates(),
            markers: default_markers(),
            preferred_delimiter: default_preferred_delimiter(),
            fallback_delimiter: default_fallback_delimiter(),
            sniff_window: default_sniff_window(),
            marker_window: default_marker_window(),
        }
    }
}

/// Network fetch settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchConfig {
    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Whole-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Total attempts per fetch (first try included). Retries apply to
    /// transport errors and 5xx responses only, never 4xx.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts in seconds
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    2
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl FetchConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// Main ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Default source when the caller passes no locator
    #[serde(default = "default_source_url")]
    pub source_url: String,

    /// Records per committed batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Wall-clock budget for one run, in seconds
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,

    /// Error messages retained in the report; further errors are counted
    /// but not kept.
    #[serde(default = "default_error_sample_limit")]
    pub error_sample_limit: usize,

    #[serde(default)]
    pub encoding: EncodingConfig,

    #[serde(default)]
    pub fetch: FetchConfig,
}

fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}

fn default_batch_size() -> usize {
    1000
}

fn default_run_timeout_secs() -> u64 {
    3600
}

fn default_error_sample_limit() -> usize {
    10
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            source_url: default_source_url(),
            batch_size: default_batch_size(),
            run_timeout_secs: default_run_timeout_secs(),
            error_sample_limit: default_error_sample_limit(),
            encoding: EncodingConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl ImportConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// - `IMPORT_SOURCE_URL`
    /// - `IMPORT_BATCH_SIZE`
    /// - `IMPORT_RUN_TIMEOUT_SECS`
    /// - `IMPORT_ENCODINGS` (comma-separated candidate labels, in order)
    /// - `IMPORT_FETCH_MAX_ATTEMPTS`
    /// - `IMPORT_FETCH_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, ImportError> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("IMPORT_SOURCE_URL") {
            config.source_url = url;
        }
        if let Ok(size) = std::env::var("IMPORT_BATCH_SIZE") {
            config.batch_size = size
                .parse()
                .map_err(|_| ImportError::Config(format!("invalid IMPORT_BATCH_SIZE: {size}")))?;
        }
        if let Ok(secs) = std::env::var("IMPORT_RUN_TIMEOUT_SECS") {
            config.run_timeout_secs = secs.parse().map_err(|_| {
                ImportError::Config(format!("invalid IMPORT_RUN_TIMEOUT_SECS: {secs}"))
            })?;
        }
        if let Ok(labels) = std::env::var("IMPORT_ENCODINGS") {
            config.encoding.candidates = labels
                .split(',')
                .map(|label| label.trim().to_string())
                .filter(|label| !label.is_empty())
                .collect();
        }
        if let Ok(attempts) = std::env::var("IMPORT_FETCH_MAX_ATTEMPTS") {
            config.fetch.max_attempts = attempts.parse().map_err(|_| {
                ImportError::Config(format!("invalid IMPORT_FETCH_MAX_ATTEMPTS: {attempts}"))
            })?;
        }
        if let Ok(secs) = std::env::var("IMPORT_FETCH_TIMEOUT_SECS") {
            config.fetch.request_timeout_secs = secs.parse().map_err(|_| {
                ImportError::Config(format!("invalid IMPORT_FETCH_TIMEOUT_SECS: {secs}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ImportError> {
        if self.batch_size == 0 {
            return Err(ImportError::Config("batch_size must be > 0".into()));
        }
        if self.encoding.candidates.is_empty() {
            return Err(ImportError::Config(
                "at least one candidate encoding is required".into(),
            ));
        }
        if self.encoding.markers.is_empty() {
            return Err(ImportError::Config(
                "at least one marker character is required".into(),
            ));
        }
        if self.fetch.max_attempts == 0 {
            return Err(ImportError::Config("fetch.max_attempts must be > 0".into()));
        }
        if self.run_timeout_secs == 0 {
            return Err(ImportError::Config("run_timeout_secs must be > 0".into()));
        }
        Ok(())
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ImportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.error_sample_limit, 10);
        assert_eq!(config.encoding.candidates[0], "iso-8859-1");
        assert_eq!(config.encoding.preferred_delimiter, ';');
        assert_eq!(config.encoding.fallback_delimiter, ',');
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let config = ImportConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ImportError::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_candidates() {
        let mut config = ImportConfig::default();
        config.encoding.candidates.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_markers_cover_both_cases() {
        let config = EncodingConfig::default();
        assert!(config.markers.contains(&'ç'));
        assert!(config.markers.contains(&'Ç'));
    }
}
