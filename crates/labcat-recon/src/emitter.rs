//! Applies a [`MutationPlan`] to a [`ProductSink`].
//!
//! Updates run first, then inserts, then deletes. A failed mutation is
//! recorded and the batch moves on; committing what succeeded is the sink's
//! business once `emit` returns.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::future::Future;

use labcat_core::CategoryLabel;
use serde::Serialize;
use thiserror::Error;

use crate::plan::{MutationPlan, PlannedDelete, PlannedInsert, PlannedUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Update,
    Insert,
    Delete,
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationKind::Update => f.write_str("update"),
            MutationKind::Insert => f.write_str("insert"),
            MutationKind::Delete => f.write_str("delete"),
        }
    }
}

/// What a sink did with a mutation it accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    /// The store already reflected the mutation.
    Unchanged,
}

/// A single mutation that failed, with the identity of its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{kind} of {target} failed: {reason}")]
pub struct MutationError {
    pub kind: MutationKind,
    pub target: String,
    pub reason: String,
}

/// Destination for planned mutations.
///
/// Implementations decide how "already applied" is detected and report it as
/// [`MutationOutcome::Unchanged`] rather than an error.
pub trait ProductSink {
    type Error: Display;

    fn update_product(
        &mut self,
        update: &PlannedUpdate,
    ) -> impl Future<Output = Result<MutationOutcome, Self::Error>>;

    fn insert_product(
        &mut self,
        insert: &PlannedInsert,
    ) -> impl Future<Output = Result<MutationOutcome, Self::Error>>;

    fn delete_product(
        &mut self,
        delete: &PlannedDelete,
    ) -> impl Future<Output = Result<MutationOutcome, Self::Error>>;
}

/// Which mutation kinds the emitter should hand to the sink. Disabled kinds
/// are counted as skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitOptions {
    pub updates: bool,
    pub inserts: bool,
    pub deletes: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            updates: true,
            inserts: true,
            deletes: true,
        }
    }
}

/// `attempted == succeeded + failed + skipped` holds for every instance the
/// emitter produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EmitCounts {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl EmitCounts {
    fn add(&mut self, other: EmitCounts) {
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmitReport {
    pub totals: EmitCounts,
    pub updates: EmitCounts,
    pub inserts: EmitCounts,
    pub deletes: EmitCounts,
    pub failures: Vec<MutationError>,
    /// Applied updates and inserts per resulting category.
    pub by_category: BTreeMap<String, usize>,
    /// Applied updates and inserts per brand.
    pub by_brand: BTreeMap<String, usize>,
}

impl EmitReport {
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.totals.failed > 0
    }

    fn counts_mut(&mut self, kind: MutationKind) -> &mut EmitCounts {
        match kind {
            MutationKind::Update => &mut self.updates,
            MutationKind::Insert => &mut self.inserts,
            MutationKind::Delete => &mut self.deletes,
        }
    }

    fn record_disabled(&mut self, kind: MutationKind) {
        let counts = self.counts_mut(kind);
        counts.attempted += 1;
        counts.skipped += 1;
    }

    fn record<E: Display>(
        &mut self,
        kind: MutationKind,
        target: String,
        result: Result<MutationOutcome, E>,
        tally: Option<(CategoryLabel, Option<&str>)>,
    ) {
        let counts = self.counts_mut(kind);
        counts.attempted += 1;
        match result {
            Ok(MutationOutcome::Applied) => {
                counts.succeeded += 1;
                tracing::debug!(kind = %kind, target = %target, "mutation applied");
                if let Some((category, brand)) = tally {
                    *self.by_category.entry(category.to_string()).or_default() += 1;
                    if let Some(brand) = brand {
                        *self.by_brand.entry(brand.to_string()).or_default() += 1;
                    }
                }
            }
            Ok(MutationOutcome::Unchanged) => {
                counts.skipped += 1;
                tracing::debug!(kind = %kind, target = %target, "mutation already applied");
            }
            Err(e) => {
                counts.failed += 1;
                let reason = e.to_string();
                tracing::error!(kind = %kind, target = %target, error = %reason, "mutation failed");
                self.failures.push(MutationError {
                    kind,
                    target,
                    reason,
                });
            }
        }
    }

    fn finish(&mut self) {
        let mut totals = EmitCounts::default();
        totals.add(self.updates);
        totals.add(self.inserts);
        totals.add(self.deletes);
        self.totals = totals;
    }
}

fn update_target(update: &PlannedUpdate) -> String {
    format!("product {}", update.id)
}

fn insert_target(insert: &PlannedInsert) -> String {
    format!("{}|||{} (row {})", insert.brand, insert.part_number, insert.source_row)
}

fn delete_target(delete: &PlannedDelete) -> String {
    format!("product {}", delete.id)
}

/// Hands every planned mutation to `sink`, awaiting each before the next.
///
/// Never fails as a whole: per-mutation errors are collected in the report.
pub async fn emit<S: ProductSink>(
    plan: &MutationPlan,
    sink: &mut S,
    options: &EmitOptions,
) -> EmitReport {
    let mut report = EmitReport::default();

    for update in &plan.updates {
        if !options.updates {
            report.record_disabled(MutationKind::Update);
            continue;
        }
        let result = sink.update_product(update).await;
        report.record(
            MutationKind::Update,
            update_target(update),
            result,
            Some((update.category, update.brand.as_deref())),
        );
    }

    for insert in &plan.inserts {
        if !options.inserts {
            report.record_disabled(MutationKind::Insert);
            continue;
        }
        let result = sink.insert_product(insert).await;
        report.record(
            MutationKind::Insert,
            insert_target(insert),
            result,
            Some((insert.category, Some(insert.brand.as_str()))),
        );
    }

    for delete in &plan.deletes {
        if !options.deletes {
            report.record_disabled(MutationKind::Delete);
            continue;
        }
        let result = sink.delete_product(delete).await;
        report.record(MutationKind::Delete, delete_target(delete), result, None);
    }

    report.finish();
    tracing::info!(
        attempted = report.totals.attempted,
        succeeded = report.totals.succeeded,
        failed = report.totals.failed,
        skipped = report.totals.skipped,
        "emit complete"
    );
    report
}

#[cfg(test)]
#[path = "emitter_test.rs"]
mod tests;
