use std::path::Path;

use anyhow::Context;
use varcat_core::{DesiredState, ProductId, ReconciliationSummary};

/// Read a desired-state document from disk.
pub(crate) fn read_desired_state(path: &Path) -> anyhow::Result<DesiredState> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let state = serde_json::from_str(&content)
        .with_context(|| format!("invalid desired-state document {}", path.display()))?;
    Ok(state)
}

/// Reconcile a product against the desired-state file at `file`.
///
/// When `dry_run` is `true` the changes are planned inside a rolled-back
/// transaction and printed without being written.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if
/// reconciliation fails. A failed reconciliation writes nothing.
pub(crate) async fn run_product_reconcile(
    pool: &sqlx::PgPool,
    id: i64,
    file: &Path,
    dry_run: bool,
) -> anyhow::Result<()> {
    let desired = read_desired_state(file)?;
    let product_id = ProductId(id);

    let summary = if dry_run {
        varcat_db::plan_product(pool, product_id, &desired).await?
    } else {
        varcat_db::reconcile_product(pool, product_id, &desired).await?
    };

    if dry_run {
        println!("dry-run: no changes written");
    }
    print!("{}", render_summary(&summary));
    Ok(())
}

/// Render a summary as one line per change, followed by a totals line.
pub(crate) fn render_summary(summary: &ReconciliationSummary) -> String {
    let mut out = String::new();

    for tag in &summary.tags_added {
        out.push_str(&format!("+ tag    {} (axis {})\n", tag.title, tag.axis_id));
    }
    for change in &summary.prices_added {
        out.push_str(&format!(
            "+ price  {} {} x{}\n",
            change.combination, change.price, change.stock
        ));
    }
    for change in &summary.prices_updated {
        out.push_str(&format!(
            "~ price  {} {} x{}\n",
            change.combination, change.price, change.stock
        ));
    }
    for combination in &summary.prices_removed {
        out.push_str(&format!("- price  {combination}\n"));
    }
    for tag in &summary.tags_removed {
        out.push_str(&format!("- tag    {} (axis {})\n", tag.title, tag.axis_id));
    }

    out.push_str(&format!(
        "product {}: {} change(s), {} unchanged price record(s)\n",
        summary.product_id,
        summary.total_changes(),
        summary.prices_unchanged
    ));
    out
}
