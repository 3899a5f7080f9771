//! Domain models for the medicines registry
//!
//! Field set mirrors the ANVISA open-data export: eleven declared columns,
//! two of them dates. Every text field is either a non-empty trimmed string
//! or NULL; emptiness is always represented as NULL, never as `""`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Declared column names of the source file, exact and case-sensitive.
/// Columns outside this list are ignored; all of these are optional.
pub const COLUMNS: [&str; 11] = [
    "TIPO_PRODUTO",
    "NOME_PRODUTO",
    "DATA_FINALIZACAO_PROCESSO",
    "CATEGORIA_REGULATORIA",
    "NUMERO_REGISTRO_PRODUTO",
    "DATA_VENCIMENTO_REGISTRO",
    "NUMERO_PROCESSO",
    "CLASSE_TERAPEUTICA",
    "EMPRESA_DETENTORA_REGISTRO",
    "SITUACAO_REGISTRO",
    "PRINCIPIO_ATIVO",
];

/// One source row keyed by declared header name, unparsed.
///
/// Transient: lives only between the parser and the normalizer. A column
/// missing from the map (short row, or column absent from the header)
/// normalizes to NULL downstream.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    /// 1-based line number in the source file (header is line 1)
    pub line: u64,
    fields: HashMap<&'static str, String>,
}

impl RawRecord {
    pub fn new(line: u64) -> Self {
        Self {
            line,
            fields: HashMap::new(),
        }
    }

    /// Insert a field value under a declared column name.
    pub fn insert(&mut self, column: &'static str, value: String) {
        self.fields.insert(column, value);
    }

    /// Raw text for a declared column, if the row carried one.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The persisted entity: one registered medicine.
///
/// Matches the `medicamentos` table (minus the store-generated id and
/// timestamps).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Medicamento {
    pub tipo_produto: Option<String>,
    pub nome_produto: Option<String>,
    pub data_finalizacao_processo: Option<NaiveDate>,
    pub categoria_regulatoria: Option<String>,
    pub numero_registro_produto: Option<String>,
    pub data_vencimento_registro: Option<NaiveDate>,
    pub numero_processo: Option<String>,
    pub classe_terapeutica: Option<String>,
    pub empresa_detentora_registro: Option<String>,
    pub situacao_registro: Option<String>,
    pub principio_ativo: Option<String>,
}

impl Medicamento {
    /// Text fields most useful for diagnostics, in a fixed order.
    pub fn text_fields(&self) -> [&Option<String>; 5] {
        [
            &self.nome_produto,
            &self.empresa_detentora_registro,
            &self.situacao_registro,
            &self.classe_terapeutica,
            &self.principio_ativo,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_record_missing_column() {
        let mut raw = RawRecord::new(2);
        raw.insert("TIPO_PRODUTO", "Medicamento".to_string());
        assert_eq!(raw.get("TIPO_PRODUTO"), Some("Medicamento"));
        assert_eq!(raw.get("NOME_PRODUTO"), None);
        assert_eq!(raw.len(), 1);
    }
}
