//! Sync orchestrator: drives one sheet/table pair, or all enabled pairs,
//! through read → map → coerce → validate → diff → confirm → apply, plus the
//! write-back path and the unattended auto-sync timer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use crate::catalog::{self, FieldType};
use crate::errors::{Result, SyncError};
use crate::sync::coerce::{coerce, is_blank};
use crate::sync::column_map::{auto_detect, ColumnMapping};
use crate::sync::mapping_store::{MappingStore, SyncDirection, TableMapping};
use crate::sync::ports::{SpreadsheetPort, TableStorePort};
use crate::sync::reconcile::{reconcile, row_id, SyncPreview};
use crate::sync::scheduler::{AUTO_SYNC_INTERVAL_JITTER_SECS, AUTO_SYNC_MIN_INTERVAL_SECS};
use crate::sync::validate::validate_row;

/// Process-wide sync state, read by any caller. `is_running` is cleared on
/// completion or failure of every code path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub is_running: bool,
    pub last_sync: Option<String>,
    pub next_sync: Option<String>,
    pub errors: Vec<String>,
}

/// Outcome of one completed apply phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub table: String,
    pub direction: SyncDirection,
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    pub errors: Vec<String>,
}

impl SyncResult {
    fn new(table: &str, direction: SyncDirection) -> Self {
        Self {
            table: table.to_string(),
            direction,
            added: 0,
            updated: 0,
            deleted: 0,
            errors: Vec::new(),
        }
    }
}

/// Result of a single-sheet read-sync attempt: either the computed preview,
/// or the mapping-required suspension (a required user action, not an error).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadSyncOutcome {
    MappingRequired {
        sheet_name: String,
        suggested: Vec<ColumnMapping>,
    },
    Preview(SyncPreview),
}

/// Caller policy for the apply phase. Deletions implied by the diff are
/// always reported in the preview but only executed when opted in.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyPolicy {
    pub apply_deletes: bool,
}

/// Outcome of a batch sync over the enabled mappings. When a read-direction
/// sheet has no confirmed column mapping the batch halts immediately,
/// returning the results accumulated so far plus that sheet's name.
#[derive(Debug, Clone, Default)]
pub struct BatchSyncReport {
    pub results: Vec<SyncResult>,
    pub mapping_required: Option<String>,
}

/// Clears `is_running` when the in-flight sync settles, on every code path.
struct RunGuard {
    running: Arc<AtomicBool>,
    status: Arc<Mutex<SyncStatus>>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.status.lock().expect("status lock").is_running = false;
    }
}

/// The sync orchestrator. One instance per running application; explicitly
/// disposable via [`SyncService::stop_auto_sync`] to cancel its timer.
pub struct SyncService {
    sheets: Arc<dyn SpreadsheetPort>,
    store: Arc<dyn TableStorePort>,
    mappings: Arc<MappingStore>,
    status: Arc<Mutex<SyncStatus>>,
    running: Arc<AtomicBool>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl SyncService {
    pub fn new(
        sheets: Arc<dyn SpreadsheetPort>,
        store: Arc<dyn TableStorePort>,
        mappings: Arc<MappingStore>,
    ) -> Self {
        Self {
            sheets,
            store,
            mappings,
            status: Arc::new(Mutex::new(SyncStatus::default())),
            running: Arc::new(AtomicBool::new(false)),
            timer: Mutex::new(None),
        }
    }

    /// Snapshot of the current sync status.
    pub fn status(&self) -> SyncStatus {
        self.status.lock().expect("status lock").clone()
    }

    /// The mapping configuration this orchestrator iterates over.
    pub fn mapping_store(&self) -> Arc<MappingStore> {
        Arc::clone(&self.mappings)
    }

    /// Acquire the single-flight guard. A request arriving while a sync is in
    /// flight is rejected, never interleaved: the diff computes its
    /// destination snapshot once and must not race a concurrent apply.
    fn begin(&self) -> Result<RunGuard> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SyncError::Busy);
        }
        self.status.lock().expect("status lock").is_running = true;
        Ok(RunGuard {
            running: Arc::clone(&self.running),
            status: Arc::clone(&self.status),
        })
    }

    fn settle(&self, guard: RunGuard) {
        drop(guard);
        self.status.lock().expect("status lock").last_sync = Some(Utc::now().to_rfc3339());
    }

    fn record_failure(&self, guard: RunGuard, error: &SyncError) {
        drop(guard);
        self.status
            .lock()
            .expect("status lock")
            .errors
            .push(error.to_string());
    }

    /// Compute the preview for one sheet's read-sync, or surface the
    /// mapping-required suspension when no confirmed mapping exists yet.
    ///
    /// The preview is ephemeral: confirm it with [`Self::apply_preview`] or
    /// discard it with [`Self::cancel_preview`]. Nothing is written here.
    pub async fn preview_read_sync(&self, sheet_name: &str) -> Result<ReadSyncOutcome> {
        let guard = self.begin()?;
        let mapping = self.require_mapping(sheet_name)?;

        if !mapping.has_confirmed_mapping() {
            let sheet = match self.sheets.read_rows(sheet_name).await {
                Ok(sheet) => sheet,
                Err(error) => {
                    self.record_failure(guard, &error);
                    return Err(error);
                }
            };
            drop(guard);
            return Ok(ReadSyncOutcome::MappingRequired {
                sheet_name: sheet_name.to_string(),
                suggested: auto_detect(&sheet.headers, &mapping.table_name),
            });
        }

        match self.build_read_preview(&mapping).await {
            Ok(preview) => {
                drop(guard);
                Ok(ReadSyncOutcome::Preview(preview))
            }
            Err(error) => {
                self.record_failure(guard, &error);
                Err(error)
            }
        }
    }

    /// Apply a confirmed preview against the destination store.
    ///
    /// `to_add` is inserted as one batch; `to_update` rows are applied one at
    /// a time, continuing past individual failures; `to_delete` runs only
    /// under an opted-in policy. Transport failures abort the remainder.
    pub async fn apply_preview(
        &self,
        preview: SyncPreview,
        policy: ApplyPolicy,
    ) -> Result<SyncResult> {
        let guard = self.begin()?;
        let sheet_name = preview.sheet_name.clone();
        match self.apply_preview_inner(preview, policy).await {
            Ok(result) => {
                let _ = self
                    .mappings
                    .touch_last_sync(&sheet_name, Utc::now().to_rfc3339());
                self.settle(guard);
                Ok(result)
            }
            Err(error) => {
                self.record_failure(guard, &error);
                Err(error)
            }
        }
    }

    /// Discard a pending preview. Synchronous and side-effect-free: nothing
    /// has been written yet.
    pub fn cancel_preview(&self, preview: SyncPreview) {
        debug!(
            "preview for sheet '{}' cancelled ({} add / {} update / {} delete discarded)",
            preview.sheet_name,
            preview.to_add.len(),
            preview.to_update.len(),
            preview.to_delete.len()
        );
    }

    /// Push the full destination snapshot back to the sheet, overwriting it
    /// wholesale. Fails fast without a write-capable credential.
    pub async fn write_sync(&self, sheet_name: &str) -> Result<SyncResult> {
        let guard = self.begin()?;
        let mapping = self.require_mapping(sheet_name)?;
        match self.write_sync_inner(&mapping).await {
            Ok(result) => {
                let _ = self
                    .mappings
                    .touch_last_sync(sheet_name, Utc::now().to_rfc3339());
                self.settle(guard);
                Ok(result)
            }
            Err(error) => {
                self.record_failure(guard, &error);
                Err(error)
            }
        }
    }

    /// Sync every enabled mapping in configuration order. A read-direction
    /// sheet without a confirmed mapping halts the batch immediately with the
    /// partial results; it is surfaced, not silently skipped.
    pub async fn sync_all(&self, policy: ApplyPolicy) -> Result<BatchSyncReport> {
        let guard = self.begin()?;
        let started = std::time::Instant::now();
        match self.sync_all_inner(policy).await {
            Ok(report) => {
                debug!(
                    "batch sync finished: {} result(s) in {} ms",
                    report.results.len(),
                    started.elapsed().as_millis()
                );
                self.settle(guard);
                Ok(report)
            }
            Err(error) => {
                self.record_failure(guard, &error);
                Err(error)
            }
        }
    }

    /// Sync a named subset of enabled mappings, same semantics as
    /// [`Self::sync_all`].
    pub async fn sync_selected(
        &self,
        sheet_names: &[String],
        policy: ApplyPolicy,
    ) -> Result<BatchSyncReport> {
        let guard = self.begin()?;
        match self.sync_batch(policy, |mapping| {
            sheet_names.iter().any(|name| name == &mapping.sheet_name)
        })
        .await
        {
            Ok(report) => {
                self.settle(guard);
                Ok(report)
            }
            Err(error) => {
                self.record_failure(guard, &error);
                Err(error)
            }
        }
    }

    async fn sync_all_inner(&self, policy: ApplyPolicy) -> Result<BatchSyncReport> {
        self.sync_batch(policy, |_| true).await
    }

    async fn sync_batch(
        &self,
        policy: ApplyPolicy,
        selected: impl Fn(&TableMapping) -> bool,
    ) -> Result<BatchSyncReport> {
        let mut report = BatchSyncReport::default();

        for mapping in self
            .mappings
            .all()
            .into_iter()
            .filter(|mapping| mapping.enabled && selected(mapping))
        {
            if mapping.direction == SyncDirection::Write {
                match self.write_sync_inner(&mapping).await {
                    Ok(result) => report.results.push(result),
                    Err(error) if error.is_fatal() => return Err(error),
                    Err(error) => {
                        // Auth and write failures stay scoped to this sheet.
                        let mut result =
                            SyncResult::new(&mapping.table_name, mapping.direction);
                        result.errors.push(error.to_string());
                        report.results.push(result);
                    }
                }
                continue;
            }

            if !mapping.has_confirmed_mapping() {
                warn!(
                    "batch halted: sheet '{}' has no confirmed column mapping",
                    mapping.sheet_name
                );
                report.mapping_required = Some(mapping.sheet_name.clone());
                return Ok(report);
            }

            let preview = self.build_read_preview(&mapping).await?;
            let mut result = self.apply_preview_inner(preview, policy).await?;

            if mapping.direction == SyncDirection::Bidirectional {
                // Refresh the sheet with server-computed derived values.
                match self.write_sync_inner(&mapping).await {
                    Ok(write_result) => result.errors.extend(write_result.errors),
                    Err(error) if error.is_fatal() => return Err(error),
                    Err(error) => result.errors.push(error.to_string()),
                }
            }

            let _ = self
                .mappings
                .touch_last_sync(&mapping.sheet_name, Utc::now().to_rfc3339());
            report.results.push(result);
        }

        Ok(report)
    }

    fn require_mapping(&self, sheet_name: &str) -> Result<TableMapping> {
        self.mappings
            .get(sheet_name)
            .ok_or_else(|| SyncError::config(format!("sheet '{}' is not configured", sheet_name)))
    }

    async fn build_read_preview(&self, mapping: &TableMapping) -> Result<SyncPreview> {
        let sheet = self.sheets.read_rows(&mapping.sheet_name).await?;
        let schema = catalog::schema_of(&mapping.table_name);

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // Resolve each confirmed mapping to its current header position; a
        // header that disappeared since confirmation reads as null.
        let mut columns = Vec::new();
        for column_mapping in mapping.column_mappings.iter().filter(|m| m.matched) {
            let position = sheet
                .headers
                .iter()
                .position(|header| header == &column_mapping.source_header);
            if position.is_none() {
                warnings.push(format!(
                    "coluna '{}' não existe mais na planilha",
                    column_mapping.source_header
                ));
            }
            columns.push((column_mapping, position));
        }

        let mut incoming: Vec<Map<String, Value>> = Vec::new();
        for (index, raw_row) in sheet.rows.iter().enumerate() {
            if raw_row.iter().all(is_blank) {
                continue;
            }

            let mut row = Map::new();
            for (column_mapping, position) in &columns {
                let raw = position
                    .and_then(|position| raw_row.get(position))
                    .unwrap_or(&Value::Null);
                let field_type = schema
                    .and_then(|schema| schema.column(&column_mapping.destination_field))
                    .map(|column| column.field_type)
                    .unwrap_or(FieldType::String);
                row.insert(
                    column_mapping.destination_field.clone(),
                    coerce(raw, field_type),
                );
            }

            if let Some(schema) = schema {
                let row_report = validate_row(&row, schema);
                for warning in &row_report.warnings {
                    warnings.push(format!("linha {}: {}", index + 2, warning.message));
                }
                if !row_report.is_valid() {
                    for error in &row_report.errors {
                        errors.push(format!("linha {}: {}", index + 2, error.message));
                    }
                    continue;
                }
            }
            incoming.push(row);
        }

        let existing = self.store.select_all(&mapping.table_name).await?;
        let diff = reconcile(incoming, &existing, schema);
        warnings.extend(diff.warnings);

        debug!(
            "preview for '{}' → '{}': {} add / {} update / {} delete / {} row error(s)",
            mapping.sheet_name,
            mapping.table_name,
            diff.to_add.len(),
            diff.to_update.len(),
            diff.to_delete.len(),
            errors.len()
        );

        Ok(SyncPreview {
            sheet_name: mapping.sheet_name.clone(),
            table_name: mapping.table_name.clone(),
            column_mappings: mapping.column_mappings.clone(),
            to_add: diff.to_add,
            to_update: diff.to_update,
            to_delete: diff.to_delete,
            errors,
            warnings,
        })
    }

    async fn apply_preview_inner(
        &self,
        preview: SyncPreview,
        policy: ApplyPolicy,
    ) -> Result<SyncResult> {
        let mut result = SyncResult::new(&preview.table_name, SyncDirection::Read);
        result.errors.extend(preview.errors.iter().cloned());

        if !preview.to_add.is_empty() {
            match self
                .store
                .insert_many(&preview.table_name, &preview.to_add)
                .await
            {
                Ok(()) => result.added = preview.to_add.len(),
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => result.errors.push(error.to_string()),
            }
        }

        for row in &preview.to_update {
            let Some(id) = row_id(row) else {
                result
                    .errors
                    .push("linha sem identificador na fase de update".to_string());
                continue;
            };
            match self.store.update_one(&preview.table_name, &id, row).await {
                Ok(()) => result.updated += 1,
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => result.errors.push(format!("id '{}': {}", id, error)),
            }
        }

        if policy.apply_deletes {
            for row in &preview.to_delete {
                let Some(id) = row_id(row) else {
                    continue;
                };
                match self.store.delete_one(&preview.table_name, &id).await {
                    Ok(()) => result.deleted += 1,
                    Err(error) if error.is_fatal() => return Err(error),
                    Err(error) => result.errors.push(format!("id '{}': {}", id, error)),
                }
            }
        }

        Ok(result)
    }

    async fn write_sync_inner(&self, mapping: &TableMapping) -> Result<SyncResult> {
        if !self.sheets.can_write() {
            return Err(SyncError::auth(format!(
                "escrita na planilha '{}' requer credencial com permissão de escrita",
                mapping.sheet_name
            )));
        }

        let rows = self.store.select_all(&mapping.table_name).await?;

        // Project destination rows through the confirmed mappings, falling
        // back to the full schema for write-only pairs configured without one.
        let columns: Vec<(String, String)> = if mapping.has_confirmed_mapping() {
            mapping
                .column_mappings
                .iter()
                .filter(|column_mapping| column_mapping.matched)
                .map(|column_mapping| {
                    (
                        column_mapping.source_header.clone(),
                        column_mapping.destination_field.clone(),
                    )
                })
                .collect()
        } else {
            catalog::schema_of(&mapping.table_name)
                .map(|schema| {
                    schema
                        .columns
                        .iter()
                        .map(|column| (column.name.to_string(), column.name.to_string()))
                        .collect()
                })
                .unwrap_or_default()
        };

        if columns.is_empty() {
            return Err(SyncError::config(format!(
                "sem colunas para escrever na planilha '{}'",
                mapping.sheet_name
            )));
        }

        let mut out: Vec<Vec<Value>> = Vec::with_capacity(rows.len() + 1);
        out.push(
            columns
                .iter()
                .map(|(header, _)| Value::String(header.clone()))
                .collect(),
        );
        for row in &rows {
            out.push(
                columns
                    .iter()
                    .map(|(_, field)| row.get(field).cloned().unwrap_or(Value::Null))
                    .collect(),
            );
        }

        let written = self
            .sheets
            .write_rows(&mapping.sheet_name, &out, true)
            .await?;
        debug!(
            "write-sync pushed {} row(s) to sheet '{}'",
            written, mapping.sheet_name
        );

        let mut result = SyncResult::new(&mapping.table_name, SyncDirection::Write);
        result.updated = written;
        Ok(result)
    }

    /// Start the unattended auto-sync loop. Starting again replaces any
    /// previous timer, so at most one is ever active.
    pub fn start_auto_sync(self: &Arc<Self>, interval_secs: u64) {
        let interval = interval_secs.max(AUTO_SYNC_MIN_INTERVAL_SECS);
        let mut timer = self.timer.lock().expect("timer lock");
        if let Some(previous) = timer.take() {
            previous.abort();
        }

        self.stamp_next_sync(interval);
        let service = Arc::clone(self);
        *timer = Some(tokio::spawn(async move {
            loop {
                let jitter = rand::thread_rng().gen_range(0..=AUTO_SYNC_INTERVAL_JITTER_SECS);
                tokio::time::sleep(Duration::from_secs(interval + jitter)).await;
                match service.sync_all(ApplyPolicy::default()).await {
                    Ok(report) => debug!(
                        "auto-sync tick: {} result(s), mapping required: {:?}",
                        report.results.len(),
                        report.mapping_required
                    ),
                    Err(SyncError::Busy) => debug!("auto-sync tick skipped: sync in flight"),
                    Err(error) => warn!("auto-sync tick failed: {}", error),
                }
                service.stamp_next_sync(interval);
            }
        }));
    }

    /// Stop the auto-sync loop and clear the next-sync timestamp. Safe to
    /// call when no timer is active.
    pub fn stop_auto_sync(&self) {
        if let Some(timer) = self.timer.lock().expect("timer lock").take() {
            timer.abort();
        }
        self.status.lock().expect("status lock").next_sync = None;
    }

    /// True while the auto-sync timer is armed.
    pub fn auto_sync_active(&self) -> bool {
        self.timer.lock().expect("timer lock").is_some()
    }

    fn stamp_next_sync(&self, interval: u64) {
        self.status.lock().expect("status lock").next_sync =
            Some((Utc::now() + chrono::Duration::seconds(interval as i64)).to_rfc3339());
    }
}
