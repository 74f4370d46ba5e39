//! Database operations for the `products` table.
//!
//! Every function takes a generic executor so it runs equally against the
//! pool or inside a transaction savepoint.

use chrono::{DateTime, Utc};
use labcat_core::normalize::{normalize_identifier_opt, normalize_text_opt};
use labcat_core::CurrentRecord;
use sqlx::PgExecutor;

use crate::DbError;

/// A row from the `products` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub product_code: Option<String>,
    pub prefix: Option<String>,
    pub brand: Option<String>,
    pub part_number: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Stored rows pass through the same cell normalization as CSV input, so a
/// key with stray whitespace still matches its sheet row.
impl From<ProductRow> for CurrentRecord {
    fn from(row: ProductRow) -> Self {
        CurrentRecord {
            id: row.id,
            product_code: normalize_identifier_opt(row.product_code.as_deref()),
            brand: normalize_text_opt(row.brand.as_deref()),
            part_number: normalize_identifier_opt(row.part_number.as_deref()),
            name: normalize_text_opt(row.name.as_deref()),
            category: normalize_text_opt(row.category.as_deref()),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Column values for a new product.
#[derive(Debug, Clone, Copy)]
pub struct NewProduct<'a> {
    pub product_code: &'a str,
    pub prefix: &'a str,
    pub brand: &'a str,
    pub part_number: &'a str,
    pub name: &'a str,
    pub category: &'a str,
}

/// Returns all products ordered by `id`, optionally limited to one brand.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products<'e, E>(executor: E, brand: Option<&str>) -> Result<Vec<ProductRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT id, product_code, prefix, brand, part_number, name, category, \
                created_at, updated_at \
         FROM products \
         WHERE ($1::TEXT IS NULL OR brand = $1) \
         ORDER BY id",
    )
    .bind(brand)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

/// Counts all rows in `products`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_products<'e, E>(executor: E) -> Result<i64, DbError>
where
    E: PgExecutor<'e>,
{
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
        .fetch_one(executor)
        .await?;
    Ok(count)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn product_exists<'e, E>(executor: E, id: i64) -> Result<bool, DbError>
where
    E: PgExecutor<'e>,
{
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
            .bind(id)
            .fetch_one(executor)
            .await?;
    Ok(exists)
}

/// Sets `name`, `category` and `updated_at` on product `id`, but only when
/// name or category actually differ.
///
/// Returns `true` if a row was written. `false` means the row already held
/// these values or does not exist; see [`product_exists`].
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_product_if_changed<'e, E>(
    executor: E,
    id: i64,
    name: &str,
    category: &str,
) -> Result<bool, DbError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE products \
         SET name = $2, category = $3, updated_at = NOW() \
         WHERE id = $1 \
           AND (name IS DISTINCT FROM $2 OR category IS DISTINCT FROM $3)",
    )
    .bind(id)
    .bind(name)
    .bind(category)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Inserts a product unless one with the same `(brand, part_number)` exists.
///
/// Returns the new `id`, or `None` when the key was already present.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_product_if_absent<'e, E>(
    executor: E,
    product: &NewProduct<'_>,
) -> Result<Option<i64>, DbError>
where
    E: PgExecutor<'e>,
{
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO products \
             (product_code, prefix, brand, part_number, name, category, created_at, updated_at) \
         SELECT $1, $2, $3, $4, $5, $6, NOW(), NOW() \
         WHERE NOT EXISTS ( \
             SELECT 1 FROM products WHERE brand = $3 AND part_number = $4 \
         ) \
         RETURNING id",
    )
    .bind(product.product_code)
    .bind(product.prefix)
    .bind(product.brand)
    .bind(product.part_number)
    .bind(product.name)
    .bind(product.category)
    .fetch_optional(executor)
    .await?;

    Ok(id)
}

/// Deletes product `id`. Returns `false` if it was already gone.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_product<'e, E>(executor: E, id: i64) -> Result<bool, DbError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
