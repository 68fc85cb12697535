//! Full-replace reconciliation between incoming sheet rows and the current
//! destination rows.
//!
//! The sheet is the authoritative membership list for its table: destination
//! rows whose id is absent from the incoming set land in `to_delete`. Rows are
//! partitioned by identifier set membership in O(n+m); no value-level diffing
//! is performed, so every incoming row with a known id produces an update even
//! when nothing changed.

use std::collections::HashSet;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::catalog::TableSchema;
use crate::sync::column_map::ColumnMapping;

/// The ephemeral, unapplied result of one sync attempt: mapping + coercion +
/// validation + diff, awaiting confirmation. Consumed exactly once by the
/// apply phase or discarded by cancellation; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPreview {
    pub sheet_name: String,
    pub table_name: String,
    pub column_mappings: Vec<ColumnMapping>,
    pub to_add: Vec<Value>,
    pub to_update: Vec<Value>,
    pub to_delete: Vec<Value>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Insert/update/delete partition produced by [`reconcile`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub to_add: Vec<Value>,
    pub to_update: Vec<Value>,
    pub to_delete: Vec<Value>,
    pub warnings: Vec<String>,
}

/// Read a row identifier as a comparable string. String and numeric ids are
/// accepted; blank strings count as missing.
pub fn row_id(row: &Value) -> Option<String> {
    id_value(row.get("id"))
}

fn id_value(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(id)) if !id.trim().is_empty() => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    }
}

/// Partition incoming rows against the destination snapshot.
///
/// - an incoming row whose id exists in the destination goes to `to_update`;
/// - a row without an id receives a freshly generated identifier and goes to
///   `to_add`, as does a row carrying an id the destination does not know;
/// - every destination row whose id is absent from the incoming id set goes
///   to `to_delete`.
///
/// Derived fields are stripped from `to_add` and `to_update`; the destination
/// computes those itself.
pub fn reconcile(
    incoming: Vec<Map<String, Value>>,
    existing: &[Value],
    schema: Option<&TableSchema>,
) -> Reconciliation {
    let existing_ids: HashSet<String> = existing.iter().filter_map(row_id).collect();

    let mut out = Reconciliation::default();
    let mut incoming_ids: HashSet<String> = HashSet::new();

    for mut row in incoming {
        strip_derived(&mut row, schema);
        match id_value(row.get("id")) {
            Some(id) => {
                if !incoming_ids.insert(id.clone()) {
                    out.warnings
                        .push(format!("id '{}' repetido na planilha", id));
                }
                if existing_ids.contains(&id) {
                    out.to_update.push(Value::Object(row));
                } else {
                    out.to_add.push(Value::Object(row));
                }
            }
            None => {
                let id = Uuid::new_v4().to_string();
                incoming_ids.insert(id.clone());
                row.insert("id".to_string(), Value::String(id));
                out.to_add.push(Value::Object(row));
            }
        }
    }

    for row in existing {
        match row_id(row) {
            Some(id) if incoming_ids.contains(&id) => {}
            _ => out.to_delete.push(row.clone()),
        }
    }

    out
}

fn strip_derived(row: &mut Map<String, Value>, schema: Option<&TableSchema>) {
    let Some(schema) = schema else {
        return;
    };
    for column in schema.derived_columns() {
        row.remove(column.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::schema_of;
    use serde_json::json;

    fn rows(values: Vec<Value>) -> Vec<Map<String, Value>> {
        values
            .into_iter()
            .map(|value| value.as_object().cloned().expect("object literal"))
            .collect()
    }

    fn ids(rows: &[Value]) -> Vec<String> {
        rows.iter().filter_map(row_id).collect()
    }

    #[test]
    fn partition_is_exhaustive_and_disjoint() {
        let existing = vec![
            json!({"id": "A", "valor": 1}),
            json!({"id": "B", "valor": 2}),
            json!({"id": "C", "valor": 3}),
        ];
        let incoming = rows(vec![
            json!({"id": "B", "valor": 20}),
            json!({"id": "D", "valor": 40}),
        ]);

        let diff = reconcile(incoming, &existing, None);
        assert_eq!(ids(&diff.to_update), ["B"]);
        assert_eq!(ids(&diff.to_add), ["D"]);
        let mut deleted = ids(&diff.to_delete);
        deleted.sort();
        assert_eq!(deleted, ["A", "C"]);
    }

    #[test]
    fn rows_without_id_get_a_fresh_one() {
        let diff = reconcile(rows(vec![json!({"valor": 10})]), &[], None);
        assert_eq!(diff.to_add.len(), 1);
        let id = row_id(&diff.to_add[0]).expect("generated id");
        assert!(uuid::Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn derived_fields_are_stripped_from_writes() {
        let schema = schema_of("transacoes");
        let existing = vec![json!({"id": "tx-1"})];
        let incoming = rows(vec![
            json!({"id": "tx-1", "valor": 10, "saldo_apos": 99}),
            json!({"valor": 5, "saldo_apos": 104}),
        ]);

        let diff = reconcile(incoming, &existing, schema);
        for row in diff.to_update.iter().chain(diff.to_add.iter()) {
            assert!(row.get("saldo_apos").is_none(), "derived field leaked: {}", row);
        }
    }

    #[test]
    fn numeric_ids_compare_against_string_ids() {
        let existing = vec![json!({"id": "7", "valor": 1})];
        let diff = reconcile(rows(vec![json!({"id": 7, "valor": 2})]), &existing, None);
        assert_eq!(diff.to_update.len(), 1);
        assert!(diff.to_delete.is_empty());
    }

    #[test]
    fn duplicate_incoming_ids_warn() {
        let diff = reconcile(
            rows(vec![json!({"id": "x"}), json!({"id": "x"})]),
            &[],
            None,
        );
        assert_eq!(diff.warnings.len(), 1);
        assert!(diff.warnings[0].contains("repetido"));
    }

    #[test]
    fn resync_with_no_changes_updates_everything_and_adds_nothing() {
        let existing = vec![
            json!({"id": "A", "valor": 1}),
            json!({"id": "B", "valor": 2}),
        ];
        let incoming = || {
            rows(vec![
                json!({"id": "A", "valor": 1}),
                json!({"id": "B", "valor": 2}),
            ])
        };

        let first = reconcile(incoming(), &existing, None);
        let second = reconcile(incoming(), &existing, None);
        assert!(first.to_add.is_empty());
        // Write-every-match-by-id: unchanged rows still produce updates.
        assert_eq!(first.to_update.len(), 2);
        assert!(first.to_delete.is_empty());
        assert_eq!(first, second);
    }
}
