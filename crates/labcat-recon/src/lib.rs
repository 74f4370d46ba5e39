//! Reconciliation of a hand-verified product sheet against the catalog.
//!
//! The stages run in order and share nothing but their inputs and outputs:
//! [`loader`] turns CSV into records, [`matcher`] partitions them by composite
//! key, [`plan`] classifies names into concrete mutations, and [`emitter`]
//! hands those mutations to a [`ProductSink`].

pub mod emitter;
pub mod error;
pub mod export;
pub mod loader;
pub mod matcher;
pub mod plan;
pub mod report;
pub mod snapshot;

pub use emitter::{
    emit, EmitCounts, EmitOptions, EmitReport, MutationError, MutationKind, MutationOutcome,
    ProductSink,
};
pub use error::ReconError;
pub use export::{write_current, write_exports, ExportPaths};
pub use loader::{load_authoritative, load_current_csv, read_authoritative, read_current};
pub use matcher::{
    match_records, DuplicateKey, MatchOutcome, Provenance, SkipReason, SkippedRecord,
    StatusConflict, UpdatePair,
};
pub use plan::{
    plan_mutations, plan_reclassification, MutationPlan, PlannedDelete, PlannedInsert,
    PlannedUpdate,
};
pub use report::RunSummary;
pub use snapshot::{SnapshotError, SnapshotSink};
