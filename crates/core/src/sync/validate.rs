//! Row validation against the destination schema.
//!
//! Runs after coercion. Rows that fail validation are excluded from the
//! reconciling diff and surfaced as row-indexed errors; they are never
//! silently dropped.

use serde_json::{Map, Value};

use crate::catalog::{FieldType, TableSchema};
use crate::sync::coerce::is_blank;

/// One field-level problem found in a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

/// Validation outcome for one coerced row.
#[derive(Debug, Clone, Default)]
pub struct RowReport {
    pub errors: Vec<FieldIssue>,
    pub warnings: Vec<FieldIssue>,
}

impl RowReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check a coerced row against the table schema.
///
/// Every `required` column that is missing, null, or blank produces an error
/// keyed by field name. Identifier columns are exempt: a missing id is
/// assigned during reconciliation, not rejected here. Keys the schema does
/// not declare are reported as warnings.
pub fn validate_row(row: &Map<String, Value>, schema: &TableSchema) -> RowReport {
    let mut report = RowReport::default();

    for column in schema.columns {
        if !column.required || column.field_type == FieldType::Identifier {
            continue;
        }
        let missing = match row.get(column.name) {
            None => true,
            Some(value) => is_blank(value),
        };
        if missing {
            report.errors.push(FieldIssue {
                field: column.name.to_string(),
                message: format!("campo obrigatório '{}' ausente ou vazio", column.name),
            });
        }
    }

    for key in row.keys() {
        if schema.column(key).is_none() {
            report.warnings.push(FieldIssue {
                field: key.clone(),
                message: format!("campo '{}' não existe na tabela '{}'", key, schema.table),
            });
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::schema_of;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn complete_row_is_valid() {
        let schema = schema_of("transacoes").unwrap();
        let report = validate_row(
            &row(json!({
                "data": "2024-03-05",
                "tipo": "aporte",
                "valor": 1234.56,
            })),
            schema,
        );
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let schema = schema_of("transacoes").unwrap();
        let report = validate_row(&row(json!({"data": "2024-03-05", "valor": 10})), schema);
        assert!(!report.is_valid());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].field, "tipo");
    }

    #[test]
    fn blank_required_field_is_an_error() {
        let schema = schema_of("transacoes").unwrap();
        let report = validate_row(
            &row(json!({"data": "", "tipo": "aporte", "valor": 10})),
            schema,
        );
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].field, "data");
    }

    #[test]
    fn missing_id_is_not_an_error() {
        // A fresh identifier is assigned during reconciliation.
        let schema = schema_of("transacoes").unwrap();
        let report = validate_row(
            &row(json!({"data": "2024-03-05", "tipo": "aporte", "valor": 10})),
            schema,
        );
        assert!(report.is_valid());
    }

    #[test]
    fn unknown_keys_warn_but_do_not_invalidate() {
        let schema = schema_of("bancos").unwrap();
        let report = validate_row(&row(json!({"nome": "Banco X", "cor": "azul"})), schema);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].field, "cor");
    }
}
