//! Database maintenance and reference-data command handlers.

/// Verify the database answers a trivial query.
///
/// # Errors
///
/// Returns an error if the query fails.
pub(crate) async fn run_db_ping(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    varcat_db::ping(pool).await?;
    println!("database ok");
    Ok(())
}

/// Apply pending migrations and report how many ran.
///
/// # Errors
///
/// Returns an error if any migration fails.
pub(crate) async fn run_db_migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let applied = varcat_db::run_migrations(pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}

/// Upsert the variant axes listed in the configured axes file.
///
/// # Errors
///
/// Returns an error if the axes file is missing or invalid, or the upsert
/// transaction fails.
pub(crate) async fn run_db_seed(
    pool: &sqlx::PgPool,
    config: &varcat_core::AppConfig,
) -> anyhow::Result<()> {
    let axes_file = varcat_core::load_axes(&config.axes_path)?;
    let count = varcat_db::seed_axes(pool, &axes_file.axes).await?;
    tracing::info!(count, path = %config.axes_path.display(), "seeded variant axes");
    println!("seeded {count} variant axes");
    Ok(())
}

/// Print the active variant axes as a table.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_axes_list(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let axes = varcat_db::list_active_axes(pool).await?;

    if axes.is_empty() {
        println!("no active variant axes; run `db seed` first");
        return Ok(());
    }

    println!("{:<8}TITLE", "ID");
    for axis in &axes {
        println!("{:<8}{}", axis.id, axis.title);
    }

    Ok(())
}
