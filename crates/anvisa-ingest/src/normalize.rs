//! Field normalization
//!
//! Turns one [`RawRecord`] into a [`Medicamento`]. The rules are small and
//! total: trimming, the empty/`"None"` tokens collapsing to NULL, and
//! day/month/year dates that either parse or become NULL. Nothing here can
//! fail a row; a value the rules cannot interpret is a NULL, not an error.
//! Business validation of field contents is intentionally out of scope.

use chrono::NaiveDate;

use crate::models::{Medicamento, RawRecord};

/// Date format of the export, e.g. `21/03/2019`.
const DATE_FORMAT: &str = "%d/%m/%Y";

/// Trim a raw value; empty and the literal `"None"` become NULL.
pub fn clean_string(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() || trimmed == "None" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a `DD/MM/YYYY` date. Wrong shape or a nonexistent calendar date
/// (31/02/2024) is NULL, never an error.
pub fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    let trimmed = value?.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).ok()
}

/// Normalize one raw row into the persisted shape.
pub fn normalize(raw: &RawRecord) -> Medicamento {
    Medicamento {
        tipo_produto: clean_string(raw.get("TIPO_PRODUTO")),
        nome_produto: clean_string(raw.get("NOME_PRODUTO")),
        data_finalizacao_processo: parse_date(raw.get("DATA_FINALIZACAO_PROCESSO")),
        categoria_regulatoria: clean_string(raw.get("CATEGORIA_REGULATORIA")),
        numero_registro_produto: clean_string(raw.get("NUMERO_REGISTRO_PRODUTO")),
        data_vencimento_registro: parse_date(raw.get("DATA_VENCIMENTO_REGISTRO")),
        numero_processo: clean_string(raw.get("NUMERO_PROCESSO")),
        classe_terapeutica: clean_string(raw.get("CLASSE_TERAPEUTICA")),
        empresa_detentora_registro: clean_string(raw.get("EMPRESA_DETENTORA_REGISTRO")),
        situacao_registro: clean_string(raw.get("SITUACAO_REGISTRO")),
        principio_ativo: clean_string(raw.get("PRINCIPIO_ATIVO")),
    }
}
