//! Postgres implementation of [`CatalogStore`] and the transactional entry
//! points built on it.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use varcat_core::{
    load_snapshot, prepare, reconcile, AxisId, CatalogStore, DesiredState, PriceRecord,
    PriceRecordId, ProductId, ReconcileError, ReconciliationSummary, TagId, VariantAxis,
    VariantTag, MAX_AXES,
};

use crate::axes::AxisRow;
use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `product_variant_tags` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct TagRow {
    id: i64,
    axis_id: i64,
    variant_title: String,
}

impl From<TagRow> for VariantTag {
    fn from(row: TagRow) -> Self {
        Self {
            id: TagId(row.id),
            axis_id: AxisId(row.axis_id),
            title: row.variant_title,
        }
    }
}

/// A row from the `product_variant_prices` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PriceRow {
    id: i64,
    variant_tag_one: Option<i64>,
    variant_tag_two: Option<i64>,
    variant_tag_three: Option<i64>,
    price: Decimal,
    stock: i64,
}

impl From<PriceRow> for PriceRecord {
    fn from(row: PriceRow) -> Self {
        Self {
            id: PriceRecordId(row.id),
            slots: [
                row.variant_tag_one.map(TagId),
                row.variant_tag_two.map(TagId),
                row.variant_tag_three.map(TagId),
            ],
            price: row.price,
            stock: row.stock,
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// [`CatalogStore`] over one open connection, normally the connection of a
/// transaction (`&mut *tx`).
pub struct PgCatalogStore<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgCatalogStore<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

impl CatalogStore for PgCatalogStore<'_> {
    type Error = DbError;

    async fn lock_product(&mut self, product_id: ProductId) -> Result<bool, DbError> {
        let row: Option<i64> =
            sqlx::query_scalar::<_, i64>("SELECT id FROM products WHERE id = $1 FOR UPDATE")
                .bind(product_id.0)
                .fetch_optional(&mut *self.conn)
                .await?;

        Ok(row.is_some())
    }

    async fn find_axis(&mut self, axis_id: AxisId) -> Result<Option<VariantAxis>, DbError> {
        let row = sqlx::query_as::<_, AxisRow>(
            "SELECT id, title, active, created_at, updated_at \
             FROM variant_axes \
             WHERE id = $1",
        )
        .bind(axis_id.0)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(row.map(VariantAxis::from))
    }

    async fn list_tags(&mut self, product_id: ProductId) -> Result<Vec<VariantTag>, DbError> {
        let rows = sqlx::query_as::<_, TagRow>(
            "SELECT id, axis_id, variant_title \
             FROM product_variant_tags \
             WHERE product_id = $1 \
             ORDER BY id",
        )
        .bind(product_id.0)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows.into_iter().map(VariantTag::from).collect())
    }

    async fn create_tag(
        &mut self,
        product_id: ProductId,
        axis_id: AxisId,
        title: &str,
    ) -> Result<VariantTag, DbError> {
        let row = sqlx::query_as::<_, TagRow>(
            "INSERT INTO product_variant_tags (product_id, axis_id, variant_title) \
             VALUES ($1, $2, $3) \
             RETURNING id, axis_id, variant_title",
        )
        .bind(product_id.0)
        .bind(axis_id.0)
        .bind(title)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(row.into())
    }

    async fn delete_tags(
        &mut self,
        product_id: ProductId,
        tag_ids: &[TagId],
    ) -> Result<u64, DbError> {
        if tag_ids.is_empty() {
            return Ok(0);
        }

        let ids: Vec<i64> = tag_ids.iter().map(|t| t.0).collect();
        let deleted = sqlx::query(
            "DELETE FROM product_variant_tags \
             WHERE product_id = $1 AND id = ANY($2)",
        )
        .bind(product_id.0)
        .bind(&ids)
        .execute(&mut *self.conn)
        .await?
        .rows_affected();

        Ok(deleted)
    }

    async fn list_price_records(
        &mut self,
        product_id: ProductId,
    ) -> Result<Vec<PriceRecord>, DbError> {
        let rows = sqlx::query_as::<_, PriceRow>(
            "SELECT id, variant_tag_one, variant_tag_two, variant_tag_three, price, stock \
             FROM product_variant_prices \
             WHERE product_id = $1 \
             ORDER BY id",
        )
        .bind(product_id.0)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows.into_iter().map(PriceRecord::from).collect())
    }

    async fn create_price_record(
        &mut self,
        product_id: ProductId,
        slots: &[TagId],
        price: Decimal,
        stock: i64,
    ) -> Result<PriceRecordId, DbError> {
        debug_assert!(slots.len() <= MAX_AXES, "planner emits at most {MAX_AXES} slots");
        let slot = |i: usize| slots.get(i).map(|t| t.0);

        let id: i64 = sqlx::query_scalar::<_, i64>(
            "INSERT INTO product_variant_prices \
                 (product_id, variant_tag_one, variant_tag_two, variant_tag_three, price, stock) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id",
        )
        .bind(product_id.0)
        .bind(slot(0))
        .bind(slot(1))
        .bind(slot(2))
        .bind(price)
        .bind(stock)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(PriceRecordId(id))
    }

    async fn update_price_record(
        &mut self,
        record_id: PriceRecordId,
        price: Decimal,
        stock: i64,
    ) -> Result<(), DbError> {
        let updated = sqlx::query(
            "UPDATE product_variant_prices \
             SET price = $2, stock = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(record_id.0)
        .bind(price)
        .bind(stock)
        .execute(&mut *self.conn)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn delete_price_record(&mut self, record_id: PriceRecordId) -> Result<(), DbError> {
        let deleted = sqlx::query("DELETE FROM product_variant_prices WHERE id = $1")
            .bind(record_id.0)
            .execute(&mut *self.conn)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Reconcile one product's tags and price records against `desired` inside a
/// single transaction.
///
/// The transaction is committed only if every phase succeeds; any failure
/// rolls back all of its writes.
///
/// # Errors
///
/// Returns [`DbError::Reconcile`] for validation, lookup and phase failures,
/// or [`DbError::Sqlx`] if the transaction cannot be opened or committed.
pub async fn reconcile_product(
    pool: &PgPool,
    product_id: ProductId,
    desired: &DesiredState,
) -> Result<ReconciliationSummary, DbError> {
    let mut tx = pool.begin().await?;

    let result = {
        let mut store = PgCatalogStore::new(&mut tx);
        reconcile(&mut store, product_id, desired).await
    };

    match result {
        Ok(summary) => {
            tx.commit().await?;
            Ok(summary)
        }
        Err(e) => {
            tracing::warn!(product_id = %product_id, error = %e, "reconciliation failed; rolling back");
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(product_id = %product_id, error = %rollback_err, "rollback failed");
            }
            Err(e.into())
        }
    }
}

/// Compute what [`reconcile_product`] would change without writing anything.
///
/// Runs the same validation and lookups inside a transaction that is always
/// rolled back.
///
/// # Errors
///
/// Same as [`reconcile_product`], except that no phase failures can occur.
pub async fn plan_product(
    pool: &PgPool,
    product_id: ProductId,
    desired: &DesiredState,
) -> Result<ReconciliationSummary, DbError> {
    let mut tx = pool.begin().await?;

    let result = {
        let mut store = PgCatalogStore::new(&mut tx);
        prepare(&mut store, product_id, desired).await
    };

    if let Err(rollback_err) = tx.rollback().await {
        tracing::warn!(product_id = %product_id, error = %rollback_err, "dry-run rollback failed");
    }
    let (_, planned) = result?;
    Ok(ReconciliationSummary::from_plan(product_id, &planned))
}

/// Read a product's persisted variant state in the desired-state format.
///
/// # Errors
///
/// Returns [`DbError::Reconcile`] with a not-found error if the product does
/// not exist, or [`DbError::Sqlx`] if a query fails.
pub async fn load_product_state(
    pool: &PgPool,
    product_id: ProductId,
) -> Result<DesiredState, DbError> {
    let mut conn = pool.acquire().await?;

    let exists: Option<i64> = sqlx::query_scalar::<_, i64>("SELECT id FROM products WHERE id = $1")
        .bind(product_id.0)
        .fetch_optional(&mut *conn)
        .await?;
    if exists.is_none() {
        return Err(ReconcileError::not_found("product", product_id).into());
    }

    let mut store = PgCatalogStore::new(&mut conn);
    let snapshot = load_snapshot(&mut store, product_id).await?;
    Ok(snapshot.to_desired_state())
}
