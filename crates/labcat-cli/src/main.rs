use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod catalog;
mod reconcile;
mod sink;

#[derive(Debug, Parser)]
#[command(name = "labcat")]
#[command(about = "Reconcile verified product sheets against the lab-supplies catalog")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Match a verified sheet against current products and apply the result
    Reconcile {
        /// Verified product sheet (CSV with header row)
        #[arg(long)]
        source: PathBuf,
        /// Read current products from a CSV snapshot instead of the database
        #[arg(long)]
        current_csv: Option<PathBuf>,
        /// Directory for partition exports (defaults to `LABCAT_OUTPUT_DIR`)
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Write mutations; without this flag the run only plans and exports
        #[arg(long)]
        apply: bool,
        /// Plan deletions but do not execute them
        #[arg(long)]
        skip_deletes: bool,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
        /// Exit non-zero when any mutation fails
        #[arg(long)]
        fail_on_errors: bool,
    },
    /// Recompute categories for stored products from their names
    Reclassify {
        /// Limit to one brand
        #[arg(long)]
        brand: Option<String>,
        /// Write the new categories; without this flag changes are only listed
        #[arg(long)]
        apply: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Exit non-zero when any update fails
        #[arg(long)]
        fail_on_errors: bool,
    },
    /// Print the category for each product name
    Classify {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Dump current products to a CSV snapshot
    Export {
        /// Output CSV path
        #[arg(long)]
        out: PathBuf,
        /// Limit to one brand
        #[arg(long)]
        brand: Option<String>,
    },
    /// Database maintenance commands
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// List recent reconcile runs, or show one run in detail
    Runs {
        /// Maximum number of runs to show
        #[arg(long, default_value = "20")]
        limit: i64,
        /// Show a single run by its public id
        #[arg(long)]
        id: Option<uuid::Uuid>,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

/// Mark a run as failed, logging instead of propagating if the ledger write
/// itself fails. The caller is already returning the original error.
pub(crate) async fn fail_run_best_effort(
    pool: &sqlx::PgPool,
    run_id: i64,
    command: &str,
    message: String,
) {
    if let Err(err) = labcat_db::fail_reconcile_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            command,
            error = %err,
            "failed to mark reconcile run as failed"
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = labcat_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::debug!(env = %config.env, filter_rule = %config.filter_rule, "configuration loaded");

    match cli.command {
        Some(Commands::Reconcile {
            source,
            current_csv,
            out_dir,
            apply,
            skip_deletes,
            json,
            fail_on_errors,
        }) => {
            let options = reconcile::ReconcileOptions {
                source,
                current_csv,
                out_dir: out_dir.unwrap_or_else(|| config.output_dir.clone()),
                apply,
                skip_deletes,
                json,
                fail_on_errors: fail_on_errors || config.fail_on_errors,
            };
            reconcile::run_reconcile(&config, &options).await?;
        }
        Some(Commands::Reclassify {
            brand,
            apply,
            json,
            fail_on_errors,
        }) => {
            let pool = labcat_db::connect_pool_from_config(&config).await?;
            let result = reconcile::run_reclassify(
                &pool,
                &config,
                brand.as_deref(),
                apply,
                json,
                fail_on_errors || config.fail_on_errors,
            )
            .await;
            pool.close().await;
            result?;
        }
        Some(Commands::Classify { names }) => catalog::run_classify(&config, &names),
        Some(Commands::Export { out, brand }) => {
            let pool = labcat_db::connect_pool_from_config(&config).await?;
            let result = catalog::run_export(&pool, &out, brand.as_deref()).await;
            pool.close().await;
            result?;
        }
        Some(Commands::Db { command }) => {
            let pool = labcat_db::connect_pool_from_config(&config).await?;
            let result = match command {
                DbCommands::Ping => catalog::run_db_ping(&pool).await,
                DbCommands::Migrate => catalog::run_db_migrate(&pool).await,
            };
            pool.close().await;
            result?;
        }
        Some(Commands::Runs { limit, id }) => {
            let pool = labcat_db::connect_pool_from_config(&config).await?;
            let result = match id {
                Some(public_id) => catalog::run_show_run(&pool, public_id).await,
                None => catalog::run_list_runs(&pool, limit).await,
            };
            pool.close().await;
            result?;
        }
        None => {
            println!("labcat: no command given; see --help");
        }
    }

    Ok(())
}
