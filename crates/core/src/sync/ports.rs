//! Trait ports for the engine's external collaborators.
//!
//! The spreadsheet service, the relational store, and mapping persistence are
//! consumed as `Arc<dyn …>` seams; the core owns no transport, SQL, or file
//! format of its own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Result;
use crate::sync::mapping_store::TableMapping;

/// Descriptor of one sheet available at the spreadsheet service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetInfo {
    pub name: String,
    pub row_count: usize,
}

/// One sheet's tabular content: a header row plus positional data rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRows {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Spreadsheet service port.
///
/// `write_rows` overwrites the sheet wholesale when `clear_first` is set and
/// returns the number of rows written. Writing requires a write-capable
/// credential; implementations expose that signal through `can_write` so the
/// orchestrator can fail fast without a round-trip.
#[async_trait]
pub trait SpreadsheetPort: Send + Sync {
    async fn list_sheets(&self) -> Result<Vec<SheetInfo>>;
    async fn read_rows(&self, sheet: &str) -> Result<SheetRows>;
    async fn write_rows(&self, sheet: &str, rows: &[Vec<Value>], clear_first: bool)
        -> Result<usize>;
    fn can_write(&self) -> bool;
}

/// Relational destination store port. Rows travel as JSON objects keyed by
/// canonical field name; deletions are a separately gated operation.
#[async_trait]
pub trait TableStorePort: Send + Sync {
    async fn select_all(&self, table: &str) -> Result<Vec<Value>>;
    async fn insert_many(&self, table: &str, rows: &[Value]) -> Result<()>;
    async fn update_one(&self, table: &str, id: &str, fields: &Value) -> Result<()>;
    async fn delete_one(&self, table: &str, id: &str) -> Result<()>;
}

/// Persistence collaborator for the configured table mappings. Loaded once at
/// startup and rewritten whole on every mapping-store mutation.
pub trait MappingConfigPersistence: Send + Sync {
    fn load(&self) -> Result<Vec<TableMapping>>;
    fn persist(&self, mappings: &[TableMapping]) -> Result<()>;
}
