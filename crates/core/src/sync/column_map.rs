//! Header normalization and column auto-detection.
//!
//! Sheet headers are free-form human text ("Descrição", "Valor (R$)"); the
//! destination schema speaks canonical snake_case names. `normalize` reduces
//! both to a common key and `auto_detect` proposes a mapping, leaving
//! unmatched headers in place for a reviewer to complete by hand.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::catalog;

/// Proposed or confirmed mapping of one sheet header onto a destination
/// field. Entries with `matched = false` are retained so a reviewer can
/// complete them; only matched entries participate in coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub source_header: String,
    pub destination_field: String,
    pub matched: bool,
}

fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        'ñ' | 'Ñ' => 'n',
        _ => c,
    }
}

/// Normalize a header or field name to its matching key: lowercase, fold
/// diacritics, squash every run of non-alphanumeric characters into a single
/// `_`, trim leading/trailing `_`. Idempotent.
pub fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.chars().map(fold_diacritic) {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Propose a mapping from sheet headers onto the columns of `table`.
///
/// Greedy and order-dependent: headers claim columns first-match-wins, so no
/// two matched entries share a destination field. Ties between headers that
/// normalize identically are resolved by header order. For a table unknown to
/// the catalog every header maps to its own normalized form as a best-effort
/// passthrough.
pub fn auto_detect(headers: &[String], table: &str) -> Vec<ColumnMapping> {
    let Some(schema) = catalog::schema_of(table) else {
        return headers
            .iter()
            .map(|header| ColumnMapping {
                source_header: header.clone(),
                destination_field: normalize(header),
                matched: true,
            })
            .collect();
    };

    let mut claimed: HashSet<&'static str> = HashSet::new();
    headers
        .iter()
        .map(|header| {
            let key = normalize(header);
            let hit = schema.columns.iter().find(|column| {
                !claimed.contains(column.name)
                    && (normalize(column.name) == key
                        || column.aliases.iter().any(|alias| normalize(alias) == key))
            });
            match hit {
                Some(column) => {
                    claimed.insert(column.name);
                    ColumnMapping {
                        source_header: header.clone(),
                        destination_field: column.name.to_string(),
                        matched: true,
                    }
                }
                None => ColumnMapping {
                    source_header: header.clone(),
                    destination_field: key,
                    matched: false,
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn normalize_folds_case_diacritics_and_separators() {
        assert_eq!(normalize("Descrição"), "descricao");
        assert_eq!(normalize("Valor (R$)"), "valor_r");
        assert_eq!(normalize("  Data -- Operação  "), "data_operacao");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["Descrição", "Valor (R$)", "__a__b__", "ção/ção", "já tem_underscore"] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn auto_detect_maps_the_standard_transaction_headers() {
        let mappings = auto_detect(
            &headers(&["Data", "Tipo", "Valor", "Descrição", "Banco"]),
            "transacoes",
        );
        let fields: Vec<&str> = mappings
            .iter()
            .map(|mapping| mapping.destination_field.as_str())
            .collect();
        assert_eq!(fields, ["data", "tipo", "valor", "descricao", "banco"]);
        assert!(mappings.iter().all(|mapping| mapping.matched));
    }

    #[test]
    fn auto_detect_matches_aliases() {
        let mappings = auto_detect(&headers(&["Valor (R$)", "Obs"]), "transacoes");
        assert_eq!(mappings[0].destination_field, "valor");
        assert!(mappings[0].matched);
        assert_eq!(mappings[1].destination_field, "descricao");
        assert!(mappings[1].matched);
    }

    #[test]
    fn auto_detect_never_double_claims_a_column() {
        // Both headers normalize to "valor"; only the first may claim it.
        let mappings = auto_detect(&headers(&["Valor", "VALOR"]), "transacoes");
        assert!(mappings[0].matched);
        assert_eq!(mappings[0].destination_field, "valor");
        assert!(!mappings[1].matched);

        let matched_fields: Vec<&str> = mappings
            .iter()
            .filter(|mapping| mapping.matched)
            .map(|mapping| mapping.destination_field.as_str())
            .collect();
        let mut deduped = matched_fields.clone();
        deduped.dedup();
        assert_eq!(matched_fields, deduped);
    }

    #[test]
    fn auto_detect_retains_unmatched_headers() {
        let mappings = auto_detect(&headers(&["Data", "Coluna Estranha"]), "transacoes");
        assert_eq!(mappings.len(), 2);
        assert!(!mappings[1].matched);
        assert_eq!(mappings[1].destination_field, "coluna_estranha");
    }

    #[test]
    fn unknown_table_passes_headers_through() {
        let mappings = auto_detect(&headers(&["Foo Bar", "Baz"]), "tabela_desconhecida");
        assert_eq!(mappings[0].destination_field, "foo_bar");
        assert!(mappings[0].matched);
        assert_eq!(mappings[1].destination_field, "baz");
        assert!(mappings[1].matched);
    }
}
