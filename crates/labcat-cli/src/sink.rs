//! Postgres [`ProductSink`]: every mutation runs in its own savepoint inside
//! one run transaction, so a failed row rolls back alone and the rest of the
//! batch still commits.

use anyhow::Context as _;
use labcat_recon::{MutationOutcome, PlannedDelete, PlannedInsert, PlannedUpdate, ProductSink};
use sqlx::{Acquire, PgConnection, PgPool, Postgres, Transaction};

pub(crate) struct PgSink {
    tx: Transaction<'static, Postgres>,
}

impl PgSink {
    pub(crate) async fn begin(pool: &PgPool) -> anyhow::Result<Self> {
        let tx = pool.begin().await.context("failed to open run transaction")?;
        Ok(Self { tx })
    }

    /// Commits everything that succeeded. Failed mutations were already
    /// rolled back to their savepoints.
    pub(crate) async fn commit(self) -> anyhow::Result<()> {
        self.tx
            .commit()
            .await
            .context("failed to commit run transaction")
    }
}

async fn finish_savepoint(
    savepoint: Transaction<'_, Postgres>,
    result: anyhow::Result<MutationOutcome>,
) -> anyhow::Result<MutationOutcome> {
    match result {
        Ok(outcome) => {
            savepoint.commit().await?;
            Ok(outcome)
        }
        Err(err) => {
            if let Err(rollback_err) = savepoint.rollback().await {
                tracing::error!(error = %rollback_err, "failed to roll back savepoint");
            }
            Err(err)
        }
    }
}

async fn apply_update(conn: &mut PgConnection, update: &PlannedUpdate) -> anyhow::Result<MutationOutcome> {
    let written = labcat_db::update_product_if_changed(
        &mut *conn,
        update.id,
        &update.new_name,
        update.category.as_str(),
    )
    .await?;
    if written {
        return Ok(MutationOutcome::Applied);
    }
    if labcat_db::product_exists(&mut *conn, update.id).await? {
        Ok(MutationOutcome::Unchanged)
    } else {
        anyhow::bail!("no product with id {}", update.id)
    }
}

async fn apply_insert(conn: &mut PgConnection, insert: &PlannedInsert) -> anyhow::Result<MutationOutcome> {
    let product = labcat_db::NewProduct {
        product_code: &insert.product_code,
        prefix: &insert.prefix,
        brand: &insert.brand,
        part_number: &insert.part_number,
        name: &insert.name,
        category: insert.category.as_str(),
    };
    match labcat_db::insert_product_if_absent(conn, &product).await? {
        Some(id) => {
            tracing::debug!(id, product_code = %insert.product_code, "inserted product");
            Ok(MutationOutcome::Applied)
        }
        None => Ok(MutationOutcome::Unchanged),
    }
}

impl ProductSink for PgSink {
    type Error = anyhow::Error;

    async fn update_product(&mut self, update: &PlannedUpdate) -> anyhow::Result<MutationOutcome> {
        let mut savepoint = Acquire::begin(&mut self.tx).await?;
        let result = apply_update(&mut savepoint, update).await;
        finish_savepoint(savepoint, result).await
    }

    async fn insert_product(&mut self, insert: &PlannedInsert) -> anyhow::Result<MutationOutcome> {
        let mut savepoint = Acquire::begin(&mut self.tx).await?;
        let result = apply_insert(&mut savepoint, insert).await;
        finish_savepoint(savepoint, result).await
    }

    async fn delete_product(&mut self, delete: &PlannedDelete) -> anyhow::Result<MutationOutcome> {
        let mut savepoint = Acquire::begin(&mut self.tx).await?;
        let result = labcat_db::delete_product(&mut *savepoint, delete.id)
            .await
            .map(|deleted| {
                if deleted {
                    MutationOutcome::Applied
                } else {
                    MutationOutcome::Unchanged
                }
            })
            .map_err(anyhow::Error::from);
        finish_savepoint(savepoint, result).await
    }
}
