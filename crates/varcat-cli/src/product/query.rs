use varcat_core::ProductId;

/// Create a product and print its id.
///
/// # Errors
///
/// Returns an error if the insert fails, e.g. when the SKU is taken.
pub(crate) async fn run_product_create(
    pool: &sqlx::PgPool,
    title: &str,
    sku: &str,
    description: Option<&str>,
) -> anyhow::Result<()> {
    let product = varcat_db::create_product(pool, title, sku, description).await?;
    tracing::info!(product_id = product.id, sku = %product.sku, "created product");
    println!("created product {} ({})", product.id, product.sku);
    Ok(())
}

/// Print the persisted variant state of a product as pretty JSON.
///
/// # Errors
///
/// Returns an error if the product does not exist or a query fails.
pub(crate) async fn run_product_show(pool: &sqlx::PgPool, id: i64) -> anyhow::Result<()> {
    let product = varcat_db::get_product(pool, ProductId(id))
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {id} not found"))?;
    let state = varcat_db::load_product_state(pool, product.product_id()).await?;

    println!("# {} ({})", product.title, product.sku);
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
