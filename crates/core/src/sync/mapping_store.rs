//! Persisted sheet/table mapping configuration.
//!
//! One [`TableMapping`] per configured sheet, keyed by sheet name. The store
//! mirrors the list in memory for the orchestrator and pushes every mutation
//! through the persistence collaborator as a whole-object rewrite; column
//! mappings are replaced wholesale, never merged field-by-field.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::sync::column_map::ColumnMapping;
use crate::sync::ports::MappingConfigPersistence;

/// Direction of a configured sheet/table pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    Read,
    Write,
    Bidirectional,
}

impl SyncDirection {
    /// True when the direction pulls sheet rows into the store.
    pub fn reads(self) -> bool {
        matches!(self, Self::Read | Self::Bidirectional)
    }

    /// True when the direction pushes store rows back to the sheet.
    pub fn writes(self) -> bool {
        matches!(self, Self::Write | Self::Bidirectional)
    }
}

/// Configuration record for one sheet/table pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMapping {
    pub sheet_name: String,
    pub table_name: String,
    pub direction: SyncDirection,
    pub enabled: bool,
    pub column_mappings: Vec<ColumnMapping>,
    pub last_sync_at: Option<String>,
}

impl TableMapping {
    /// True when at least one confirmed (matched) column mapping exists, i.e.
    /// a read-sync can proceed without the mapping-required suspension.
    pub fn has_confirmed_mapping(&self) -> bool {
        self.column_mappings.iter().any(|mapping| mapping.matched)
    }
}

/// In-memory list of table mappings backed by a persistence collaborator.
pub struct MappingStore {
    persistence: Arc<dyn MappingConfigPersistence>,
    mappings: RwLock<Vec<TableMapping>>,
}

impl MappingStore {
    /// Load the persisted mapping list at startup.
    pub fn load(persistence: Arc<dyn MappingConfigPersistence>) -> Result<Self> {
        let mappings = persistence.load()?;
        Ok(Self {
            persistence,
            mappings: RwLock::new(mappings),
        })
    }

    /// Replace the record with the same sheet name, or append a new one.
    /// Whole-object semantics: the previous record is not merged into.
    pub fn upsert(&self, mapping: TableMapping) -> Result<()> {
        let mut mappings = self.mappings.write().expect("mapping store lock");
        match mappings
            .iter_mut()
            .find(|existing| existing.sheet_name == mapping.sheet_name)
        {
            Some(existing) => *existing = mapping,
            None => mappings.push(mapping),
        }
        self.persistence.persist(&mappings)
    }

    /// Remove the record for a sheet, if present.
    pub fn remove(&self, sheet_name: &str) -> Result<()> {
        let mut mappings = self.mappings.write().expect("mapping store lock");
        mappings.retain(|mapping| mapping.sheet_name != sheet_name);
        self.persistence.persist(&mappings)
    }

    /// Fetch one record by sheet name.
    pub fn get(&self, sheet_name: &str) -> Option<TableMapping> {
        self.mappings
            .read()
            .expect("mapping store lock")
            .iter()
            .find(|mapping| mapping.sheet_name == sheet_name)
            .cloned()
    }

    /// Snapshot of all configured mappings, in configuration order.
    pub fn all(&self) -> Vec<TableMapping> {
        self.mappings.read().expect("mapping store lock").clone()
    }

    /// Flip the enabled flag for a sheet.
    pub fn set_enabled(&self, sheet_name: &str, enabled: bool) -> Result<()> {
        self.update_record(sheet_name, |mapping| mapping.enabled = enabled)
    }

    /// Stamp the last successful sync time (RFC 3339) for a sheet.
    pub fn touch_last_sync(&self, sheet_name: &str, at: String) -> Result<()> {
        self.update_record(sheet_name, |mapping| mapping.last_sync_at = Some(at))
    }

    fn update_record(
        &self,
        sheet_name: &str,
        apply: impl FnOnce(&mut TableMapping),
    ) -> Result<()> {
        let mut mappings = self.mappings.write().expect("mapping store lock");
        if let Some(mapping) = mappings
            .iter_mut()
            .find(|mapping| mapping.sheet_name == sheet_name)
        {
            apply(mapping);
            self.persistence.persist(&mappings)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryPersistence {
        saves: Mutex<Vec<Vec<TableMapping>>>,
    }

    impl MappingConfigPersistence for MemoryPersistence {
        fn load(&self) -> Result<Vec<TableMapping>> {
            Ok(Vec::new())
        }

        fn persist(&self, mappings: &[TableMapping]) -> Result<()> {
            self.saves
                .lock()
                .expect("test lock")
                .push(mappings.to_vec());
            Ok(())
        }
    }

    fn mapping(sheet: &str) -> TableMapping {
        TableMapping {
            sheet_name: sheet.to_string(),
            table_name: "transacoes".to_string(),
            direction: SyncDirection::Read,
            enabled: true,
            column_mappings: vec![ColumnMapping {
                source_header: "Data".to_string(),
                destination_field: "data".to_string(),
                matched: true,
            }],
            last_sync_at: None,
        }
    }

    #[test]
    fn upsert_replaces_whole_record_by_sheet_name() {
        let persistence = Arc::new(MemoryPersistence::default());
        let store = MappingStore::load(persistence.clone()).unwrap();

        store.upsert(mapping("Aportes")).unwrap();
        let mut replacement = mapping("Aportes");
        replacement.column_mappings = Vec::new();
        replacement.enabled = false;
        store.upsert(replacement).unwrap();

        let stored = store.get("Aportes").unwrap();
        assert!(stored.column_mappings.is_empty(), "old mappings merged in");
        assert!(!stored.enabled);
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn every_mutation_is_persisted() {
        let persistence = Arc::new(MemoryPersistence::default());
        let store = MappingStore::load(persistence.clone()).unwrap();

        store.upsert(mapping("Aportes")).unwrap();
        store.set_enabled("Aportes", false).unwrap();
        store
            .touch_last_sync("Aportes", "2026-08-06T12:00:00Z".to_string())
            .unwrap();
        store.remove("Aportes").unwrap();

        let saves = persistence.saves.lock().unwrap();
        assert_eq!(saves.len(), 4);
        assert!(saves.last().unwrap().is_empty());
    }

    #[test]
    fn touching_an_unknown_sheet_is_a_no_op() {
        let persistence = Arc::new(MemoryPersistence::default());
        let store = MappingStore::load(persistence.clone()).unwrap();
        store.set_enabled("Inexistente", true).unwrap();
        assert!(persistence.saves.lock().unwrap().is_empty());
    }
}
