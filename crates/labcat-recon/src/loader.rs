//! CSV loading for both record sources.
//!
//! Headers are resolved through a [`ColumnMap`] before any row is read, so a
//! source missing a required column fails without producing partial output.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord};
use labcat_core::normalize::{normalize_identifier_opt, normalize_text_opt};
use labcat_core::{
    find_column, AuthoritativeColumns, AuthoritativeRecord, ColumnMap, CurrentColumns,
    CurrentRecord, VerificationStatus,
};

use crate::error::ReconError;

/// Loads the authoritative sheet from `path`.
///
/// # Errors
///
/// Returns [`ReconError::Schema`] if a required column is missing, or an I/O
/// or CSV error if the file cannot be read.
pub fn load_authoritative(
    path: &Path,
    columns: &ColumnMap,
) -> Result<Vec<AuthoritativeRecord>, ReconError> {
    let file = File::open(path).map_err(|e| ReconError::io(path, e))?;
    read_authoritative(file, &path.display().to_string(), &columns.authoritative)
}

/// Loads an offline snapshot of the products table from `path`.
///
/// # Errors
///
/// Returns [`ReconError::Schema`] if a required column is missing,
/// [`ReconError::InvalidValue`] if an `id` cell is not an integer, or an I/O
/// or CSV error if the file cannot be read.
pub fn load_current_csv(path: &Path, columns: &ColumnMap) -> Result<Vec<CurrentRecord>, ReconError> {
    let file = File::open(path).map_err(|e| ReconError::io(path, e))?;
    read_current(file, &path.display().to_string(), &columns.current)
}

/// Reads authoritative records from any CSV reader. `source_name` is used in
/// errors and logs only.
///
/// # Errors
///
/// See [`load_authoritative`].
pub fn read_authoritative<R: Read>(
    reader: R,
    source_name: &str,
    columns: &AuthoritativeColumns,
) -> Result<Vec<AuthoritativeRecord>, ReconError> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers = header_names(&mut csv_reader, source_name)?;

    let mut missing = Vec::new();
    let brand = require(&headers, &columns.brand, "brand", &mut missing);
    let part_number = require(&headers, &columns.part_number, "part_number", &mut missing);
    let official_name = require(&headers, &columns.official_name, "official_name", &mut missing);
    if !missing.is_empty() {
        return Err(ReconError::Schema {
            source_name: source_name.to_string(),
            missing,
        });
    }
    let internal_name = find_column(&headers, &columns.internal_name);
    let status = find_column(&headers, &columns.status);
    if status.is_none() {
        tracing::info!(
            source = source_name,
            "no status column; every row is treated as consistent"
        );
    }

    let mut records = Vec::new();
    for (index, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| ReconError::csv(source_name, e))?;
        if is_blank(&record) {
            continue;
        }

        let (status, status_text) = match status {
            None => (Some(VerificationStatus::Consistent), None),
            Some(idx) => {
                let text = normalize_text_opt(record.get(idx));
                let parsed = text.as_deref().and_then(VerificationStatus::parse);
                (parsed, text)
            }
        };

        records.push(AuthoritativeRecord {
            row: line_of(&record, index),
            brand: normalize_text_opt(cell(&record, brand)),
            part_number: normalize_identifier_opt(cell(&record, part_number)),
            official_name: normalize_text_opt(cell(&record, official_name)),
            internal_name: normalize_text_opt(cell(&record, internal_name)),
            status,
            status_text,
        });
    }

    tracing::info!(source = source_name, rows = records.len(), "loaded authoritative records");
    Ok(records)
}

/// Reads current records from any CSV reader.
///
/// # Errors
///
/// See [`load_current_csv`].
pub fn read_current<R: Read>(
    reader: R,
    source_name: &str,
    columns: &CurrentColumns,
) -> Result<Vec<CurrentRecord>, ReconError> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers = header_names(&mut csv_reader, source_name)?;

    let mut missing = Vec::new();
    let id = require(&headers, &columns.id, "id", &mut missing);
    let brand = require(&headers, &columns.brand, "brand", &mut missing);
    let part_number = require(&headers, &columns.part_number, "part_number", &mut missing);
    let name = require(&headers, &columns.name, "name", &mut missing);
    if !missing.is_empty() {
        return Err(ReconError::Schema {
            source_name: source_name.to_string(),
            missing,
        });
    }
    let product_code = find_column(&headers, &columns.product_code);
    let category = find_column(&headers, &columns.category);
    let created_at = find_column(&headers, &columns.created_at);
    let updated_at = find_column(&headers, &columns.updated_at);

    let mut records = Vec::new();
    for (index, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| ReconError::csv(source_name, e))?;
        if is_blank(&record) {
            continue;
        }

        let raw_id = cell(&record, id).unwrap_or("").trim();
        let parsed_id = raw_id.parse::<i64>().map_err(|_| ReconError::InvalidValue {
            path: source_name.to_string(),
            line: line_of(&record, index),
            field: "id",
            value: raw_id.to_string(),
        })?;

        records.push(CurrentRecord {
            id: parsed_id,
            product_code: normalize_identifier_opt(cell(&record, product_code)),
            brand: normalize_text_opt(cell(&record, brand)),
            part_number: normalize_identifier_opt(cell(&record, part_number)),
            name: normalize_text_opt(cell(&record, name)),
            category: normalize_text_opt(cell(&record, category)),
            created_at: cell(&record, created_at).and_then(parse_timestamp),
            updated_at: cell(&record, updated_at).and_then(parse_timestamp),
        });
    }

    tracing::info!(source = source_name, rows = records.len(), "loaded current records");
    Ok(records)
}

fn header_names<R: Read>(
    reader: &mut csv::Reader<R>,
    source_name: &str,
) -> Result<Vec<String>, ReconError> {
    let headers = reader
        .headers()
        .map_err(|e| ReconError::csv(source_name, e))?;
    Ok(headers.iter().map(str::to_string).collect())
}

fn require(
    headers: &[String],
    aliases: &[String],
    field: &str,
    missing: &mut Vec<String>,
) -> Option<usize> {
    let found = find_column(headers, aliases);
    if found.is_none() {
        missing.push(field.to_string());
    }
    found
}

fn cell(record: &StringRecord, index: Option<usize>) -> Option<&str> {
    index.and_then(|i| record.get(i))
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|value| value.trim().is_empty())
}

/// Source line of the record, falling back to its ordinal when the reader
/// reports no position.
fn line_of(record: &StringRecord, index: usize) -> usize {
    record
        .position()
        .and_then(|pos| usize::try_from(pos.line()).ok())
        .unwrap_or(index + 2)
}

/// Accepts RFC 3339 and the naive `YYYY-MM-DD HH:MM:SS[.fff]` form that
/// database exports use; naive values are taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|naive| naive.and_utc())
        .or_else(|| {
            tracing::debug!(value = trimmed, "unparseable timestamp ignored");
            None
        })
}

#[cfg(test)]
#[path = "loader_test.rs"]
mod tests;
