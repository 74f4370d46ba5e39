//! CSV exports of a run's partitions.
//!
//! Every file gets its header row even when the partition is empty, and
//! column order is fixed per file.

use std::fs;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use labcat_core::{AuthoritativeRecord, CurrentRecord};
use serde::Serialize;

use crate::error::ReconError;
use crate::matcher::{MatchOutcome, Provenance, SkippedRecord};
use crate::plan::{MutationPlan, PlannedDelete, PlannedInsert, PlannedUpdate};

pub const TO_UPDATE_FILE: &str = "to_update.csv";
pub const TO_INSERT_FILE: &str = "to_insert.csv";
pub const TO_DELETE_FILE: &str = "to_delete.csv";
pub const UNCHANGED_FILE: &str = "unchanged.csv";
pub const INCONSISTENT_KEEP_FILE: &str = "inconsistent_keep.csv";
pub const SKIPPED_FILE: &str = "skipped.csv";

/// A row type with a fixed header. `HEADERS` lists the serialized fields in
/// declaration order.
trait ExportRow: Serialize {
    const HEADERS: &'static [&'static str];
}

impl ExportRow for PlannedUpdate {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "brand",
        "part_number",
        "old_name",
        "new_name",
        "old_category",
        "category",
        "status",
        "source_row",
    ];
}

impl ExportRow for PlannedInsert {
    const HEADERS: &'static [&'static str] = &[
        "product_code",
        "prefix",
        "brand",
        "part_number",
        "name",
        "category",
        "status",
        "source_row",
    ];
}

impl ExportRow for PlannedDelete {
    const HEADERS: &'static [&'static str] =
        &["id", "product_code", "brand", "part_number", "name", "category"];
}

impl ExportRow for CurrentRecord {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "product_code",
        "brand",
        "part_number",
        "name",
        "category",
        "created_at",
        "updated_at",
    ];
}

impl ExportRow for AuthoritativeRecord {
    const HEADERS: &'static [&'static str] = &[
        "row",
        "brand",
        "part_number",
        "official_name",
        "internal_name",
        "status",
        "status_text",
    ];
}

#[derive(Serialize)]
struct SkippedRow {
    source: &'static str,
    row: Option<usize>,
    id: Option<i64>,
    brand: Option<String>,
    part_number: Option<String>,
    reason: String,
}

impl ExportRow for SkippedRow {
    const HEADERS: &'static [&'static str] =
        &["source", "row", "id", "brand", "part_number", "reason"];
}

impl From<&SkippedRecord> for SkippedRow {
    fn from(skipped: &SkippedRecord) -> Self {
        let (source, row, id) = match skipped.provenance {
            Provenance::Authoritative { row } => ("authoritative", Some(row), None),
            Provenance::Current { id } => ("current", None, Some(id)),
        };
        Self {
            source,
            row,
            id,
            brand: skipped.key.as_ref().map(|k| k.brand.clone()),
            part_number: skipped.key.as_ref().map(|k| k.part_number.clone()),
            reason: skipped.reason.to_string(),
        }
    }
}

/// Where [`write_exports`] put each file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportPaths {
    pub to_update: PathBuf,
    pub to_insert: PathBuf,
    pub to_delete: PathBuf,
    pub unchanged: PathBuf,
    pub inconsistent_keep: PathBuf,
    pub skipped: PathBuf,
}

fn write_rows<'r, T, I>(path: &Path, rows: I) -> Result<usize, ReconError>
where
    T: ExportRow + 'r,
    I: IntoIterator<Item = &'r T>,
{
    let name = path.display().to_string();
    let export_err = |source: csv::Error| ReconError::Export {
        path: name.clone(),
        source,
    };

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(export_err)?;
    writer.write_record(T::HEADERS).map_err(export_err)?;

    let mut written = 0;
    for row in rows {
        writer.serialize(row).map_err(export_err)?;
        written += 1;
    }
    writer.flush().map_err(|e| ReconError::io(path, e))?;

    tracing::debug!(path = %name, rows = written, "wrote export");
    Ok(written)
}

/// Writes every partition of a run into `dir`, creating it if needed.
///
/// # Errors
///
/// Returns [`ReconError::Io`] if the directory cannot be created, or
/// [`ReconError::Export`] if a file cannot be written.
pub fn write_exports(
    dir: &Path,
    outcome: &MatchOutcome<'_>,
    plan: &MutationPlan,
) -> Result<ExportPaths, ReconError> {
    fs::create_dir_all(dir).map_err(|e| ReconError::io(dir, e))?;

    let paths = ExportPaths {
        to_update: dir.join(TO_UPDATE_FILE),
        to_insert: dir.join(TO_INSERT_FILE),
        to_delete: dir.join(TO_DELETE_FILE),
        unchanged: dir.join(UNCHANGED_FILE),
        inconsistent_keep: dir.join(INCONSISTENT_KEEP_FILE),
        skipped: dir.join(SKIPPED_FILE),
    };

    write_rows(&paths.to_update, &plan.updates)?;
    write_rows(&paths.to_insert, &plan.inserts)?;
    write_rows(&paths.to_delete, &plan.deletes)?;
    write_rows(&paths.unchanged, outcome.unchanged.iter().copied())?;
    write_rows(&paths.inconsistent_keep, outcome.retained.iter().copied())?;
    let skipped: Vec<SkippedRow> = outcome.skipped.iter().map(SkippedRow::from).collect();
    write_rows(&paths.skipped, &skipped)?;

    tracing::info!(dir = %dir.display(), "exports written");
    Ok(paths)
}

/// Writes products in the snapshot layout that [`crate::load_current_csv`]
/// reads back.
///
/// # Errors
///
/// Returns [`ReconError::Export`] if the file cannot be written.
pub fn write_current(path: &Path, records: &[CurrentRecord]) -> Result<usize, ReconError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ReconError::io(parent, e))?;
    }
    write_rows(path, records)
}
