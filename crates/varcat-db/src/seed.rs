use sqlx::PgPool;
use varcat_core::AxisConfig;

use crate::DbError;

/// Upsert variant axes from config into the database.
///
/// Returns the number of axes processed (inserted or updated).
/// All upserts run inside a single transaction; if any operation fails
/// the entire batch is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_axes(pool: &PgPool, axes: &[AxisConfig]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for axis in axes {
        sqlx::query(
            "INSERT INTO variant_axes (title, active) \
             VALUES ($1, $2) \
             ON CONFLICT (title) DO UPDATE SET \
                 active = EXCLUDED.active, \
                 updated_at = NOW()",
        )
        .bind(axis.title.trim())
        .bind(axis.active)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}
