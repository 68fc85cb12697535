//! Destination table catalog: the closed set of typed table shapes.
//!
//! Incoming sheet rows are untyped key/value maps until they pass coercion and
//! validation; the destination schema is never inferred from the data itself.
//! Each table shape is declared here once, at build time, and never mutated.

use serde::{Deserialize, Serialize};

/// Declared type of a destination column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Identifier,
}

/// One destination column: canonical name, type, and matching metadata.
///
/// `derived` marks a value owned by the destination store; it is stripped
/// from every outgoing write payload. `aliases` are alternate human names
/// accepted during header auto-detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    pub derived: bool,
    pub aliases: &'static [&'static str],
}

/// A destination table shape: name plus its ordered columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub table: &'static str,
    pub columns: &'static [ColumnDefinition],
}

impl TableSchema {
    /// Look up a column by canonical name.
    pub fn column(&self, name: &str) -> Option<&'static ColumnDefinition> {
        self.columns.iter().find(|col| col.name == name)
    }

    /// The identifier column of this table, if declared.
    pub fn id_column(&self) -> Option<&'static ColumnDefinition> {
        self.columns
            .iter()
            .find(|col| col.field_type == FieldType::Identifier)
    }

    /// Columns owned by the destination; never included in write payloads.
    pub fn derived_columns(&self) -> impl Iterator<Item = &'static ColumnDefinition> {
        self.columns.iter().filter(|col| col.derived)
    }
}

const fn col(
    name: &'static str,
    field_type: FieldType,
    required: bool,
    derived: bool,
    aliases: &'static [&'static str],
) -> ColumnDefinition {
    ColumnDefinition {
        name,
        field_type,
        required,
        derived,
        aliases,
    }
}

/// Canonical list of destination tables that participate in sheet sync.
pub const CATALOG_TABLES: [&str; 3] = ["transacoes", "bancos", "metas"];

const TRANSACOES: TableSchema = TableSchema {
    table: "transacoes",
    columns: &[
        col("id", FieldType::Identifier, true, false, &[]),
        col("data", FieldType::Date, true, false, &["dia", "data_operacao"]),
        col("tipo", FieldType::String, true, false, &["operacao", "movimento"]),
        col(
            "valor",
            FieldType::Number,
            true,
            false,
            &["valor_r", "quantia", "montante"],
        ),
        col(
            "descricao",
            FieldType::String,
            false,
            false,
            &["obs", "observacao", "historico"],
        ),
        col("banco", FieldType::String, false, false, &["casa", "conta"]),
        col("liquidado", FieldType::Boolean, false, false, &["pago", "confirmado"]),
        // Running balance after this entry; computed by the store.
        col("saldo_apos", FieldType::Number, false, true, &["saldo"]),
    ],
};

const BANCOS: TableSchema = TableSchema {
    table: "bancos",
    columns: &[
        col("id", FieldType::Identifier, true, false, &[]),
        col("nome", FieldType::String, true, false, &["banco", "casa"]),
        col(
            "saldo_inicial",
            FieldType::Number,
            false,
            false,
            &["deposito_inicial", "banca_inicial"],
        ),
        col("ativo", FieldType::Boolean, false, false, &["em_uso"]),
        col("saldo_atual", FieldType::Number, false, true, &["saldo"]),
    ],
};

const METAS: TableSchema = TableSchema {
    table: "metas",
    columns: &[
        col("id", FieldType::Identifier, true, false, &[]),
        col("nome", FieldType::String, true, false, &["meta", "objetivo"]),
        col(
            "valor_alvo",
            FieldType::Number,
            true,
            false,
            &["alvo", "valor_meta"],
        ),
        col("prazo", FieldType::Date, false, false, &["data_limite"]),
        col("progresso", FieldType::Number, false, true, &[]),
    ],
};

/// Read-only lookup of a destination table shape.
///
/// Unknown tables return `None`; callers fall back to an identity header
/// mapping for those.
pub fn schema_of(table: &str) -> Option<&'static TableSchema> {
    match table {
        "transacoes" => Some(&TRANSACOES),
        "bancos" => Some(&BANCOS),
        "metas" => Some(&METAS),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_table_has_no_schema() {
        assert!(schema_of("apostas").is_none());
    }

    #[test]
    fn every_catalog_table_resolves() {
        for table in CATALOG_TABLES {
            let schema = schema_of(table).expect("catalog table");
            assert_eq!(schema.table, table);
            assert!(schema.id_column().is_some(), "{} has no id column", table);
        }
    }

    #[test]
    fn derived_columns_are_never_required() {
        for table in CATALOG_TABLES {
            let schema = schema_of(table).expect("catalog table");
            for column in schema.derived_columns() {
                assert!(
                    !column.required,
                    "derived column {}.{} marked required",
                    table, column.name
                );
            }
        }
    }

    #[test]
    fn transacoes_declares_running_balance_as_derived() {
        let schema = schema_of("transacoes").unwrap();
        let saldo = schema.column("saldo_apos").unwrap();
        assert!(saldo.derived);
        assert_eq!(saldo.field_type, FieldType::Number);
    }
}
