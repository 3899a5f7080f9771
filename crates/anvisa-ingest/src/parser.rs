//! Row parsing
//!
//! Reads the first line as header, maps declared column names to their
//! positions (exact, case-sensitive), and yields one [`RawRecord`] per
//! remaining line, lazily. Row shape is tolerated rather than policed: a
//! short row leaves its trailing columns absent, a long row has its extras
//! ignored, and a row the reader cannot parse surfaces as a per-row error
//! without ending iteration. One malformed line in a multi-million-row
//! export must not kill the run; strictness, if ever wanted, changes here
//! and nowhere else.

use csv::ReaderBuilder;
use tracing::{debug, warn};

use crate::error::{ImportError, Result};
use crate::models::{RawRecord, COLUMNS};

/// Lazy iterator over source rows.
pub struct RecordIter<'s> {
    records: csv::StringRecordsIntoIter<&'s [u8]>,
    /// (position in source row, declared column name)
    columns: Vec<(usize, &'static str)>,
    line: u64,
}

impl<'s> RecordIter<'s> {
    /// Declared columns found in the header, in source order.
    pub fn mapped_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|(_, name)| *name)
    }
}

/// Build a lazy row iterator over decoded text.
///
/// The header line is consumed eagerly; everything after is pulled on
/// demand.
pub fn parse(text: &str, delimiter: char) -> Result<RecordIter<'_>> {
    if !delimiter.is_ascii() {
        return Err(ImportError::Config(format!(
            "delimiter must be ASCII, got {delimiter:?}"
        )));
    }
    // A UTF-8 BOM would otherwise glue itself onto the first header name.
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers().map_err(|e| ImportError::RowParse {
        line: 1,
        message: format!("header: {e}"),
    })?;

    let mut columns = Vec::new();
    for (idx, name) in headers.iter().enumerate() {
        if let Some(declared) = COLUMNS.iter().find(|&&c| c == name.trim()) {
            columns.push((idx, *declared));
        }
    }

    if columns.is_empty() {
        warn!(
            header_fields = headers.len(),
            "no declared column found in header; every field will normalize to null"
        );
    } else {
        debug!(mapped = columns.len(), "header mapped");
    }

    Ok(RecordIter {
        records: reader.into_records(),
        columns,
        line: 1,
    })
}

impl Iterator for RecordIter<'_> {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let result = self.records.next()?;
            self.line += 1;
            match result {
                Ok(record) => {
                    // Blank lines carry no data
                    if record.iter().all(|field| field.trim().is_empty()) {
                        continue;
                    }
                    let line = record
                        .position()
                        .map(|p| p.line())
                        .unwrap_or(self.line);
                    let mut raw = RawRecord::new(line);
                    for (idx, name) in &self.columns {
                        // Short rows simply miss trailing indices; extras
                        // beyond the header are never mapped.
                        if let Some(value) = record.get(*idx) {
                            raw.insert(name, value.to_string());
                        }
                    }
                    return Some(Ok(raw));
                },
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or(self.line);
                    return Some(Err(ImportError::RowParse {
                        line,
                        message: e.to_string(),
                    }));
                },
            }
        }
    }
}
