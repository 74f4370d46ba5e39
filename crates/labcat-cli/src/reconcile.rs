//! `reconcile` and `reclassify` command handlers.
//!
//! Fatal problems (unreadable sheet, missing columns, no database) surface
//! before any mutation. Once emission starts, per-row failures are collected
//! in the report and the run transaction still commits.

use std::path::PathBuf;

use anyhow::Context as _;
use labcat_core::{column_map_for, AppConfig, Classifier, CurrentRecord};
use labcat_recon::{
    emit, load_authoritative, load_current_csv, match_records, plan_mutations,
    plan_reclassification, write_current, write_exports, EmitOptions, EmitReport, MutationPlan,
    RunSummary, SnapshotSink,
};

use crate::fail_run_best_effort;
use crate::sink::PgSink;

/// File written next to the exports when a snapshot run is applied.
pub(crate) const CATALOG_AFTER_FILE: &str = "catalog_after.csv";

#[derive(Debug, Clone)]
pub(crate) struct ReconcileOptions {
    pub source: PathBuf,
    pub current_csv: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub apply: bool,
    pub skip_deletes: bool,
    pub json: bool,
    pub fail_on_errors: bool,
}

impl ReconcileOptions {
    fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            deletes: !self.skip_deletes,
            ..EmitOptions::default()
        }
    }
}

fn to_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

pub(crate) fn run_counts(report: &EmitReport) -> labcat_db::RunCounts {
    labcat_db::RunCounts {
        attempted: to_i32(report.totals.attempted),
        succeeded: to_i32(report.totals.succeeded),
        failed: to_i32(report.totals.failed),
        skipped: to_i32(report.totals.skipped),
    }
}

fn print_summary(summary: &RunSummary, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        print!("{summary}");
    }
    Ok(())
}

fn check_strict(report: Option<&EmitReport>, fail_on_errors: bool) -> anyhow::Result<()> {
    match report {
        Some(report) if fail_on_errors && report.has_failures() => anyhow::bail!(
            "{} of {} mutations failed",
            report.totals.failed,
            report.totals.attempted
        ),
        _ => Ok(()),
    }
}

/// Run the full pipeline: load, match, plan, export, and (with `--apply`)
/// emit.
///
/// # Errors
///
/// Returns an error if the sheet or snapshot cannot be loaded, the database
/// is unreachable, exports cannot be written, the run transaction fails to
/// commit, or strict mode is on and any mutation failed.
pub(crate) async fn run_reconcile(config: &AppConfig, options: &ReconcileOptions) -> anyhow::Result<()> {
    let columns = column_map_for(config.columns_path())?;
    let classifier = Classifier::with_filter_rule(config.filter_rule);

    let authoritative = load_authoritative(&options.source, &columns)?;

    let summary = match &options.current_csv {
        Some(snapshot) => {
            let current = load_current_csv(snapshot, &columns)?;
            reconcile_snapshot(&authoritative, current, &classifier, options).await?
        }
        None => {
            let pool = labcat_db::connect_pool_from_config(config)
                .await
                .context("failed to connect to the catalog database")?;
            let result = reconcile_database(&pool, &authoritative, &classifier, options).await;
            pool.close().await;
            result?
        }
    };

    print_summary(&summary, options.json)?;
    check_strict(summary.emit.as_ref(), options.fail_on_errors)
}

async fn reconcile_snapshot(
    authoritative: &[labcat_core::AuthoritativeRecord],
    current: Vec<CurrentRecord>,
    classifier: &Classifier,
    options: &ReconcileOptions,
) -> anyhow::Result<RunSummary> {
    let outcome = match_records(authoritative, &current);
    let plan = plan_mutations(&outcome, classifier);
    write_exports(&options.out_dir, &outcome, &plan)?;
    let summary = RunSummary::new(authoritative, current.len(), &outcome, &plan);

    if !options.apply {
        return Ok(summary);
    }

    let mut sink = SnapshotSink::new(current, chrono::Utc::now());
    let report = emit(&plan, &mut sink, &options.emit_options()).await;
    let after = options.out_dir.join(CATALOG_AFTER_FILE);
    let rows = write_current(&after, sink.records())?;
    tracing::info!(path = %after.display(), rows, "wrote applied snapshot");

    Ok(summary.with_emit(report).with_catalog_total(rows))
}

async fn reconcile_database(
    pool: &sqlx::PgPool,
    authoritative: &[labcat_core::AuthoritativeRecord],
    classifier: &Classifier,
    options: &ReconcileOptions,
) -> anyhow::Result<RunSummary> {
    let current: Vec<CurrentRecord> = labcat_db::list_products(pool, None)
        .await?
        .into_iter()
        .map(CurrentRecord::from)
        .collect();
    tracing::info!(rows = current.len(), "loaded current products");

    let outcome = match_records(authoritative, &current);
    let plan = plan_mutations(&outcome, classifier);
    write_exports(&options.out_dir, &outcome, &plan)?;
    let summary = RunSummary::new(authoritative, current.len(), &outcome, &plan);

    let source_path = options.source.display().to_string();
    let run = labcat_db::create_reconcile_run(
        pool,
        &labcat_db::NewReconcileRun {
            command: "reconcile",
            source_path: Some(&source_path),
            applied: options.apply,
        },
    )
    .await?;

    if !options.apply {
        labcat_db::complete_reconcile_run(pool, run.id, labcat_db::RunCounts::default()).await?;
        return Ok(summary);
    }

    let report = match emit_to_database(pool, &plan, &options.emit_options()).await {
        Ok(report) => report,
        Err(err) => {
            fail_run_best_effort(pool, run.id, "reconcile", format!("{err:#}")).await;
            return Err(err);
        }
    };

    if let Err(err) = labcat_db::complete_reconcile_run(pool, run.id, run_counts(&report)).await {
        fail_run_best_effort(pool, run.id, "reconcile", format!("{err:#}")).await;
        return Err(err.into());
    }
    tracing::info!(run_id = %run.public_id, "reconcile run recorded");

    let catalog_total = usize::try_from(labcat_db::count_products(pool).await?).unwrap_or(0);
    if catalog_total != summary.projected_total {
        tracing::warn!(
            projected = summary.projected_total,
            actual = catalog_total,
            "catalog size differs from projection"
        );
    }

    Ok(summary.with_emit(report).with_catalog_total(catalog_total))
}

async fn emit_to_database(
    pool: &sqlx::PgPool,
    plan: &MutationPlan,
    options: &EmitOptions,
) -> anyhow::Result<EmitReport> {
    let mut sink = PgSink::begin(pool).await?;
    let report = emit(plan, &mut sink, options).await;
    sink.commit().await?;
    Ok(report)
}

/// Recompute categories for stored products and (with `apply`) write the
/// ones that changed.
///
/// # Errors
///
/// Returns an error if products cannot be listed, the run transaction fails
/// to commit, or strict mode is on and any update failed.
pub(crate) async fn run_reclassify(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    brand: Option<&str>,
    apply: bool,
    json: bool,
    fail_on_errors: bool,
) -> anyhow::Result<()> {
    let classifier = Classifier::with_filter_rule(config.filter_rule);
    let current: Vec<CurrentRecord> = labcat_db::list_products(pool, brand)
        .await?
        .into_iter()
        .map(CurrentRecord::from)
        .collect();

    let plan = MutationPlan {
        updates: plan_reclassification(&current, &classifier),
        ..MutationPlan::default()
    };

    if !apply {
        if json {
            println!("{}", serde_json::to_string_pretty(&plan.updates)?);
        } else {
            print_reclassification(&plan);
        }
        return Ok(());
    }

    let run = labcat_db::create_reconcile_run(
        pool,
        &labcat_db::NewReconcileRun {
            command: "reclassify",
            source_path: None,
            applied: true,
        },
    )
    .await?;

    let report = match emit_to_database(pool, &plan, &EmitOptions::default()).await {
        Ok(report) => report,
        Err(err) => {
            fail_run_best_effort(pool, run.id, "reclassify", format!("{err:#}")).await;
            return Err(err);
        }
    };
    if let Err(err) = labcat_db::complete_reconcile_run(pool, run.id, run_counts(&report)).await {
        fail_run_best_effort(pool, run.id, "reclassify", format!("{err:#}")).await;
        return Err(err.into());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_reclassification(&plan);
        println!(
            "updated {} of {} ({} failed, {} unchanged)",
            report.totals.succeeded, report.totals.attempted, report.totals.failed, report.totals.skipped
        );
        for failure in &report.failures {
            println!("  {failure}");
        }
    }

    check_strict(Some(&report), fail_on_errors)
}

fn print_reclassification(plan: &MutationPlan) {
    if plan.updates.is_empty() {
        println!("all categories are current");
        return;
    }
    println!("{:<8} {:<20} {:<20} NAME", "ID", "FROM", "TO");
    for update in &plan.updates {
        println!(
            "{:<8} {:<20} {:<20} {}",
            update.id,
            update.old_category.as_deref().unwrap_or("-"),
            update.category.as_str(),
            update.new_name
        );
    }
}
