//! Database operations for the `reconcile_runs` ledger.
//!
//! A run is created in `running` status and moves exactly once, to
//! `succeeded` or `failed`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `reconcile_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReconcileRunRow {
    pub id: i64,
    pub public_id: Uuid,
    /// `reconcile` or `reclassify`.
    pub command: String,
    pub source_path: Option<String>,
    /// Whether mutations were written, as opposed to a dry run.
    pub applied: bool,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub attempted: i32,
    pub succeeded: i32,
    pub failed: i32,
    pub skipped: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct NewReconcileRun<'a> {
    pub command: &'a str,
    pub source_path: Option<&'a str>,
    pub applied: bool,
}

/// Emit counts recorded when a run completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub attempted: i32,
    pub succeeded: i32,
    pub failed: i32,
    pub skipped: i32,
}

const RUN_COLUMNS: &str = "id, public_id, command, source_path, applied, status, started_at, \
                           completed_at, attempted, succeeded, failed, skipped, error_message, \
                           created_at";

/// Creates a run in `running` status with `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_reconcile_run(
    pool: &PgPool,
    run: &NewReconcileRun<'_>,
) -> Result<ReconcileRunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, ReconcileRunRow>(&format!(
        "INSERT INTO reconcile_runs (public_id, command, source_path, applied, status, started_at) \
         VALUES ($1, $2, $3, $4, 'running', NOW()) \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(public_id)
    .bind(run.command)
    .bind(run.source_path)
    .bind(run.applied)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run as `succeeded` and records its counts.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_reconcile_run(pool: &PgPool, id: i64, counts: RunCounts) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE reconcile_runs \
         SET status = 'succeeded', completed_at = NOW(), \
             attempted = $1, succeeded = $2, failed = $3, skipped = $4 \
         WHERE id = $5 AND status = 'running'",
    )
    .bind(counts.attempted)
    .bind(counts.succeeded)
    .bind(counts.failed)
    .bind(counts.skipped)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a run as `failed` with `error_message`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_reconcile_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE reconcile_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Fetches a run by its public id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_reconcile_run(
    pool: &PgPool,
    public_id: Uuid,
) -> Result<Option<ReconcileRunRow>, DbError> {
    let row = sqlx::query_as::<_, ReconcileRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM reconcile_runs WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reconcile_runs(pool: &PgPool, limit: i64) -> Result<Vec<ReconcileRunRow>, DbError> {
    let rows = sqlx::query_as::<_, ReconcileRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM reconcile_runs ORDER BY created_at DESC, id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
