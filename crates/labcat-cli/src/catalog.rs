//! Read-only and maintenance command handlers.

use std::path::Path;

use labcat_core::{AppConfig, Classifier, CurrentRecord};

pub(crate) fn run_classify(config: &AppConfig, names: &[String]) {
    let classifier = Classifier::with_filter_rule(config.filter_rule);
    for name in names {
        println!("{}\t{name}", classifier.classify(name));
    }
}

/// Dump current products to `out` in the snapshot layout that
/// `reconcile --current-csv` reads.
///
/// # Errors
///
/// Returns an error if products cannot be listed or the file cannot be
/// written.
pub(crate) async fn run_export(
    pool: &sqlx::PgPool,
    out: &Path,
    brand: Option<&str>,
) -> anyhow::Result<()> {
    let records: Vec<CurrentRecord> = labcat_db::list_products(pool, brand)
        .await?
        .into_iter()
        .map(CurrentRecord::from)
        .collect();
    let rows = labcat_recon::write_current(out, &records)?;
    println!("exported {rows} products to {}", out.display());
    Ok(())
}

pub(crate) async fn run_db_ping(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    labcat_db::ping(pool).await?;
    println!("database ok");
    Ok(())
}

pub(crate) async fn run_db_migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let applied = labcat_db::run_migrations(pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}

/// Print the most recent reconcile runs, newest first.
///
/// # Errors
///
/// Returns an error if the ledger query fails.
pub(crate) async fn run_list_runs(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = labcat_db::list_reconcile_runs(pool, limit).await?;
    if runs.is_empty() {
        println!("no reconcile runs recorded");
        return Ok(());
    }

    println!(
        "{:<36}  {:<10}  {:<9}  {:<7}  {:>8}  {:>8}  {:>6}  STARTED",
        "RUN", "COMMAND", "STATUS", "APPLIED", "ATTEMPT", "OK", "FAILED"
    );
    for run in runs {
        println!(
            "{:<36}  {:<10}  {:<9}  {:<7}  {:>8}  {:>8}  {:>6}  {}",
            run.public_id.to_string(),
            run.command,
            run.status,
            if run.applied { "yes" } else { "no" },
            run.attempted,
            run.succeeded,
            run.failed,
            run.started_at.format("%Y-%m-%d %H:%M:%S")
        );
        if let Some(message) = &run.error_message {
            println!("    error: {message}");
        }
    }
    Ok(())
}

/// Print one reconcile run with its counts and timestamps.
///
/// # Errors
///
/// Returns an error if the ledger query fails or no run has `public_id`.
pub(crate) async fn run_show_run(pool: &sqlx::PgPool, public_id: uuid::Uuid) -> anyhow::Result<()> {
    let Some(run) = labcat_db::get_reconcile_run(pool, public_id).await? else {
        anyhow::bail!("no reconcile run with id {public_id}");
    };

    println!("run        {}", run.public_id);
    println!("command    {}", run.command);
    println!("source     {}", run.source_path.as_deref().unwrap_or("-"));
    println!("applied    {}", if run.applied { "yes" } else { "no" });
    println!("status     {}", run.status);
    println!("started    {}", run.started_at.format("%Y-%m-%d %H:%M:%S"));
    match run.completed_at {
        Some(at) => println!("completed  {}", at.format("%Y-%m-%d %H:%M:%S")),
        None => println!("completed  -"),
    }
    println!(
        "mutations  {} attempted, {} succeeded, {} failed, {} skipped",
        run.attempted, run.succeeded, run.failed, run.skipped
    );
    if let Some(message) = &run.error_message {
        println!("error      {message}");
    }
    Ok(())
}
