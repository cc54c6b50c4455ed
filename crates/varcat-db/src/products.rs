//! Database operations for the `products` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use varcat_core::ProductId;

use crate::DbError;

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub title: String,
    pub sku: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRow {
    #[must_use]
    pub fn product_id(&self) -> ProductId {
        ProductId(self.id)
    }
}

/// Inserts a product and returns the new row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including when `sku` is
/// already taken.
pub async fn create_product(
    pool: &PgPool,
    title: &str,
    sku: &str,
    description: Option<&str>,
) -> Result<ProductRow, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "INSERT INTO products (title, sku, description) \
         VALUES ($1, $2, $3) \
         RETURNING id, title, sku, description, created_at, updated_at",
    )
    .bind(title)
    .bind(sku)
    .bind(description)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns a single product by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product(pool: &PgPool, product_id: ProductId) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "SELECT id, title, sku, description, created_at, updated_at \
         FROM products \
         WHERE id = $1",
    )
    .bind(product_id.0)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
