//! Encoding and delimiter resolution
//!
//! The upstream export has shipped as ISO-8859-1, windows-1252 and (rarely)
//! UTF-8 over the years, with no content-type signal. Several of those
//! encodings decode the same bytes without error while mapping them to the
//! wrong characters, so "first decode that doesn't fail" is not good
//! enough: a candidate is only trusted outright when the decoded sample
//! contains at least one marker character of the dataset's language.
//!
//! Resolution order per candidate: strict decode first (any invalid byte
//! sequence fails the attempt), then a lenient retry that substitutes
//! invalid sequences. A marker hit on a strict decode confirms the
//! candidate and stops the search; otherwise the first candidate that
//! produced any non-empty output wins as an unconfirmed fallback.

use encoding_rs::Encoding;
use tracing::{debug, warn};

use crate::config::EncodingConfig;
use crate::error::{ImportError, Result};

/// Outcome of resolving one payload.
#[derive(Debug, Clone)]
pub struct EncodingResolution {
    /// Configured label of the winning candidate
    pub encoding: String,
    /// Whether a marker character confirmed the candidate. Unconfirmed
    /// output may still be linguistically wrong; the pipeline records and
    /// logs this rather than hiding it.
    pub confirmed: bool,
    /// Resolved field delimiter
    pub delimiter: char,
    /// Fully decoded text
    pub text: String,
}

/// Diagnostic verdict for a single candidate, used by the analyze command.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CandidateProbe {
    pub label: String,
    /// Strict decode succeeded
    pub strict_ok: bool,
    /// Lenient decode produced non-empty output
    pub lenient_ok: bool,
    /// Marker characters seen in the strict-decoded sample window
    pub markers_found: usize,
    /// U+FFFD substitutions produced by the lenient decode
    pub replacements: usize,
}

pub struct EncodingResolver<'c> {
    config: &'c EncodingConfig,
}

impl<'c> EncodingResolver<'c> {
    pub fn new(config: &'c EncodingConfig) -> Self {
        Self { config }
    }

    /// Resolve encoding and delimiter for a raw payload.
    pub fn resolve(&self, bytes: &[u8]) -> Result<EncodingResolution> {
        // First non-confirmed success in candidate order, strict preferred
        // over lenient for the same candidate.
        let mut fallback: Option<(String, String)> = None;

        for label in &self.config.candidates {
            let Some(encoding) = Encoding::for_label(label.as_bytes()) else {
                warn!(label = %label, "unknown encoding label, skipping candidate");
                continue;
            };

            if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes)
            {
                if self.count_markers(&text) > 0 {
                    debug!(label = %label, "candidate confirmed by marker characters");
                    let text = text.into_owned();
                    let delimiter = self.sniff_delimiter(&text);
                    return Ok(EncodingResolution {
                        encoding: label.clone(),
                        confirmed: true,
                        delimiter,
                        text,
                    });
                }
                if !text.is_empty() && fallback.is_none() {
                    fallback = Some((label.clone(), text.into_owned()));
                }
                // Strict succeeded; a lenient retry would yield the same text.
                continue;
            }

            let (text, _, _) = encoding.decode(bytes);
            if !text.is_empty() && fallback.is_none() {
                debug!(label = %label, "candidate decoded leniently only");
                fallback = Some((label.clone(), text.into_owned()));
            }
        }

        match fallback {
            Some((label, text)) => {
                warn!(
                    label = %label,
                    "no candidate confirmed by markers; using first decodable \
                     candidate (output may be linguistically wrong)"
                );
                let delimiter = self.sniff_delimiter(&text);
                Ok(EncodingResolution {
                    encoding: label,
                    confirmed: false,
                    delimiter,
                    text,
                })
            },
            None => Err(ImportError::EncodingUnresolved {
                tried: self.config.candidates.len(),
            }),
        }
    }

    /// Per-candidate verdicts without committing to a choice.
    pub fn probe(&self, bytes: &[u8]) -> Vec<CandidateProbe> {
        self.config
            .candidates
            .iter()
            .map(|label| {
                let Some(encoding) = Encoding::for_label(label.as_bytes()) else {
                    return CandidateProbe {
                        label: label.clone(),
                        strict_ok: false,
                        lenient_ok: false,
                        markers_found: 0,
                        replacements: 0,
                    };
                };

                let strict = encoding.decode_without_bom_handling_and_without_replacement(bytes);
                let markers_found = strict
                    .as_deref()
                    .map(|text| self.count_markers(text))
                    .unwrap_or(0);
                let (lenient, _, _) = encoding.decode(bytes);
                let replacements = lenient
                    .chars()
                    .take(self.config.marker_window)
                    .filter(|&c| c == char::REPLACEMENT_CHARACTER)
                    .count();

                CandidateProbe {
                    label: label.clone(),
                    strict_ok: strict.is_some(),
                    lenient_ok: !lenient.is_empty(),
                    markers_found,
                    replacements,
                }
            })
            .collect()
    }

    fn count_markers(&self, text: &str) -> usize {
        text.chars()
            .take(self.config.marker_window)
            .filter(|c| self.config.markers.contains(c))
            .count()
    }

    /// Delimiter resolution is independent of which candidate wins: if the
    /// preferred token appears in the sniff window, use it, else fall back.
    fn sniff_delimiter(&self, text: &str) -> char {
        let preferred = self.config.preferred_delimiter;
        if text
            .chars()
            .take(self.config.sniff_window)
            .any(|c| c == preferred)
        {
            preferred
        } else {
            self.config.fallback_delimiter
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(candidates: &[&str], markers: &str) -> EncodingConfig {
        EncodingConfig {
            candidates: candidates.iter().map(|s| s.to_string()).collect(),
            markers: markers.chars().collect(),
            ..EncodingConfig::default()
        }
    }

    #[test]
    fn test_marker_confirmation_beats_earlier_silent_decode() {
        // UTF-8 bytes of "ação;x". windows-1252 strict-decodes them without
        // error but produces mojibake with no 'ç'; utf-8 decodes the real
        // text. The resolver must keep probing and pick utf-8.
        let bytes = "ação;x".as_bytes();
        let config = config_with(&["windows-1252", "utf-8"], "ç");
        let resolution = EncodingResolver::new(&config).resolve(bytes).unwrap();
        assert_eq!(resolution.encoding, "utf-8");
        assert!(resolution.confirmed);
        assert_eq!(resolution.text, "ação;x");
    }

    #[test]
    fn test_unconfirmed_fallback_is_first_in_list_order() {
        // Plain ASCII decodes under every candidate and confirms under none.
        let bytes = b"TIPO_PRODUTO;NOME_PRODUTO\n";
        let config = config_with(&["iso-8859-1", "utf-8"], "\u{e7}");
        let resolution = EncodingResolver::new(&config).resolve(bytes).unwrap();
        assert_eq!(resolution.encoding, "iso-8859-1");
        assert!(!resolution.confirmed);
    }

    #[test]
    fn test_lenient_decode_records_fallback_when_strict_fails() {
        // 0xE7 alone is invalid UTF-8; with utf-8 as the only candidate the
        // lenient retry must still produce a usable (unconfirmed) result.
        let bytes = &[0x61, 0xE7, 0x62];
        let config = config_with(&["utf-8"], "ç");
        let resolution = EncodingResolver::new(&config).resolve(bytes).unwrap();
        assert_eq!(resolution.encoding, "utf-8");
        assert!(!resolution.confirmed);
        assert!(resolution.text.contains(char::REPLACEMENT_CHARACTER));
    }

    #[test]
    fn test_empty_payload_is_unresolved() {
        let config = config_with(&["iso-8859-1", "utf-8"], "ç");
        let err = EncodingResolver::new(&config).resolve(b"").unwrap_err();
        assert!(matches!(err, ImportError::EncodingUnresolved { tried: 2 }));
    }

    #[test]
    fn test_windows_1252_portuguese_is_confirmed() {
        // "situação" in windows-1252: ç = 0xE7, ã = 0xE3
        let bytes = &[0x73, 0x69, 0x74, 0x75, 0x61, 0xE7, 0xE3, 0x6F];
        let config = config_with(&["windows-1252"], "çã");
        let resolution = EncodingResolver::new(&config).resolve(bytes).unwrap();
        assert!(resolution.confirmed);
        assert_eq!(resolution.text, "situação");
    }

    #[test]
    fn test_delimiter_sniff_prefers_semicolon() {
        let config = EncodingConfig::default();
        let resolver = EncodingResolver::new(&config);
        let with_semicolon = resolver.resolve(b"A;B;C\n1;2;3\n").unwrap();
        assert_eq!(with_semicolon.delimiter, ';');
        let commas_only = resolver.resolve(b"A,B,C\n1,2,3\n").unwrap();
        assert_eq!(commas_only.delimiter, ',');
    }

    #[test]
    fn test_delimiter_outside_sniff_window_falls_back() {
        let mut config = EncodingConfig::default();
        config.sniff_window = 8;
        let resolver = EncodingResolver::new(&config);
        let resolution = resolver.resolve(b"AAAAAAAAAA;B\n").unwrap();
        assert_eq!(resolution.delimiter, ',');
    }

    #[test]
    fn test_probe_reports_per_candidate_verdicts() {
        let bytes = "ação".as_bytes();
        let config = config_with(&["windows-1252", "utf-8"], "ç");
        let probes = EncodingResolver::new(&config).probe(bytes);
        assert_eq!(probes.len(), 2);
        assert!(probes[0].strict_ok);
        assert_eq!(probes[0].markers_found, 0);
        assert!(probes[1].strict_ok);
        assert!(probes[1].markers_found > 0);
    }
}
