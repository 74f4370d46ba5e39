//! An in-memory [`ProductSink`] over a products snapshot.
//!
//! Used to apply a plan to a CSV snapshot when no database is involved, and
//! follows the same idempotence rules as the Postgres sink.

use chrono::{DateTime, Utc};
use labcat_core::CurrentRecord;
use thiserror::Error;

use crate::emitter::{MutationOutcome, ProductSink};
use crate::plan::{PlannedDelete, PlannedInsert, PlannedUpdate};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("no product with id {0}")]
    UnknownId(i64),
}

#[derive(Debug, Clone)]
pub struct SnapshotSink {
    records: Vec<CurrentRecord>,
    next_id: i64,
    now: DateTime<Utc>,
}

impl SnapshotSink {
    /// Wraps `records`, stamping every mutation with `now`.
    #[must_use]
    pub fn new(records: Vec<CurrentRecord>, now: DateTime<Utc>) -> Self {
        let next_id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        Self {
            records,
            next_id,
            now,
        }
    }

    #[must_use]
    pub fn records(&self) -> &[CurrentRecord] {
        &self.records
    }

    #[must_use]
    pub fn into_records(self) -> Vec<CurrentRecord> {
        self.records
    }
}

impl ProductSink for SnapshotSink {
    type Error = SnapshotError;

    async fn update_product(&mut self, update: &PlannedUpdate) -> Result<MutationOutcome, SnapshotError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == update.id)
            .ok_or(SnapshotError::UnknownId(update.id))?;

        let category = update.category.as_str();
        if record.name.as_deref() == Some(update.new_name.as_str())
            && record.category.as_deref() == Some(category)
        {
            return Ok(MutationOutcome::Unchanged);
        }
        record.name = Some(update.new_name.clone());
        record.category = Some(category.to_string());
        record.updated_at = Some(self.now);
        Ok(MutationOutcome::Applied)
    }

    async fn insert_product(&mut self, insert: &PlannedInsert) -> Result<MutationOutcome, SnapshotError> {
        let exists = self.records.iter().any(|r| {
            r.brand.as_deref() == Some(insert.brand.as_str())
                && r.part_number.as_deref() == Some(insert.part_number.as_str())
        });
        if exists {
            return Ok(MutationOutcome::Unchanged);
        }
        self.records.push(CurrentRecord {
            id: self.next_id,
            product_code: Some(insert.product_code.clone()),
            brand: Some(insert.brand.clone()),
            part_number: Some(insert.part_number.clone()),
            name: Some(insert.name.clone()),
            category: Some(insert.category.to_string()),
            created_at: Some(self.now),
            updated_at: Some(self.now),
        });
        self.next_id += 1;
        Ok(MutationOutcome::Applied)
    }

    async fn delete_product(&mut self, delete: &PlannedDelete) -> Result<MutationOutcome, SnapshotError> {
        let before = self.records.len();
        self.records.retain(|r| r.id != delete.id);
        if self.records.len() == before {
            Ok(MutationOutcome::Unchanged)
        } else {
            Ok(MutationOutcome::Applied)
        }
    }
}
