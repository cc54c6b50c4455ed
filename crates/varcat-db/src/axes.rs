//! Database operations for the `variant_axes` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use varcat_core::{AxisId, VariantAxis};

use crate::DbError;

/// A row from the `variant_axes` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AxisRow {
    pub id: i64,
    pub title: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AxisRow> for VariantAxis {
    fn from(row: AxisRow) -> Self {
        Self {
            id: AxisId(row.id),
            title: row.title,
            active: row.active,
        }
    }
}

/// Returns all active axes, ordered by title.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_axes(pool: &PgPool) -> Result<Vec<AxisRow>, DbError> {
    let rows = sqlx::query_as::<_, AxisRow>(
        "SELECT id, title, active, created_at, updated_at \
         FROM variant_axes \
         WHERE active = true \
         ORDER BY title",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single axis by id regardless of its active flag, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_axis(pool: &PgPool, axis_id: AxisId) -> Result<Option<AxisRow>, DbError> {
    let row = sqlx::query_as::<_, AxisRow>(
        "SELECT id, title, active, created_at, updated_at \
         FROM variant_axes \
         WHERE id = $1",
    )
    .bind(axis_id.0)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts an axis or updates the active flag of the existing axis with the
/// same title.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_axis(pool: &PgPool, title: &str, active: bool) -> Result<AxisRow, DbError> {
    let row = sqlx::query_as::<_, AxisRow>(
        "INSERT INTO variant_axes (title, active) \
         VALUES ($1, $2) \
         ON CONFLICT (title) DO UPDATE SET \
             active     = EXCLUDED.active, \
             updated_at = NOW() \
         RETURNING id, title, active, created_at, updated_at",
    )
    .bind(title)
    .bind(active)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
