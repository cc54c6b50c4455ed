//! Reconciliation of a product's variant tags and price records against a
//! desired state.
//!
//! Planning is pure: [`plan`] turns a [`ProductSnapshot`] and a
//! [`NormalizedDesired`] into a [`ReconciliationPlan`]. [`reconcile`] loads
//! the snapshot from a [`CatalogStore`], plans, and applies the plan in three
//! strictly ordered phases:
//!
//! 1. create new variant tags;
//! 2. remove, update and create price records, resolving new records against
//!    the tags that exist after phase 1;
//! 3. delete obsolete variant tags, including every tag of a removed axis.
//!
//! Stale price records are still resolvable while phase 2 runs because their
//! tags are only deleted in phase 3.

pub mod prices;
pub mod summary;
pub mod tags;

#[cfg(test)]
mod tests;

use std::collections::HashMap;

use crate::catalog::{AxisId, ProductId, ProductSnapshot, TagId};
use crate::desired::{DesiredState, NormalizedDesired};
use crate::error::{Phase, ReconcileError};
use crate::store::CatalogStore;

pub use prices::{plan_prices, PriceAddition, PricePlan, PriceRemoval, PriceUpdate};
pub use summary::{PriceChange, ReconciliationSummary};
pub use tags::{plan_tags, TagPlan, TagRef};

/// Full set of mutations needed to bring one product to its desired state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub tags: TagPlan,
    pub prices: PricePlan,
}

impl ReconciliationPlan {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.tags.is_empty() && self.prices.is_empty()
    }
}

/// Compute the plan for a product without touching any store.
///
/// # Errors
///
/// Returns the validation errors of [`plan_prices`].
pub fn plan(
    snapshot: &ProductSnapshot,
    desired: &NormalizedDesired,
) -> Result<ReconciliationPlan, ReconcileError> {
    let tags = plan_tags(snapshot, desired);
    let prices = plan_prices(snapshot, &tags, desired)?;
    Ok(ReconciliationPlan { tags, prices })
}

/// Read the current tags and price records of a product.
///
/// # Errors
///
/// Returns [`ReconcileError::Store`] if the store fails.
pub async fn load_snapshot<S: CatalogStore>(
    store: &mut S,
    product_id: ProductId,
) -> Result<ProductSnapshot, ReconcileError> {
    let tags = store
        .list_tags(product_id)
        .await
        .map_err(|e| ReconcileError::store(Phase::Load, format!("tags of product {product_id}"), e))?;
    let price_records = store.list_price_records(product_id).await.map_err(|e| {
        ReconcileError::store(Phase::Load, format!("price records of product {product_id}"), e)
    })?;
    Ok(ProductSnapshot::new(product_id, tags, price_records))
}

/// Validate `desired`, check the product and every desired axis, load the
/// product's snapshot and plan against it. Nothing is mutated.
///
/// # Errors
///
/// - [`ReconcileError::Validation`] / [`ReconcileError::TooManyAxes`] for a
///   malformed desired state, before any store call;
/// - [`ReconcileError::NotFound`] for an unknown product or axis;
/// - [`ReconcileError::Store`] when the store fails.
pub async fn prepare<S: CatalogStore>(
    store: &mut S,
    product_id: ProductId,
    desired: &DesiredState,
) -> Result<(ProductSnapshot, ReconciliationPlan), ReconcileError> {
    let desired = desired.normalize()?;

    let exists = store
        .lock_product(product_id)
        .await
        .map_err(|e| ReconcileError::store(Phase::Load, format!("product {product_id}"), e))?;
    if !exists {
        return Err(ReconcileError::not_found("product", product_id));
    }

    for axis_id in desired.axes.keys() {
        let axis = store
            .find_axis(*axis_id)
            .await
            .map_err(|e| ReconcileError::store(Phase::Load, format!("variant axis {axis_id}"), e))?;
        match axis {
            Some(axis) if !axis.active => {
                tracing::warn!(axis_id = %axis_id, title = %axis.title, "reconciling tags of inactive variant axis");
            }
            Some(_) => {}
            None => return Err(ReconcileError::not_found("variant axis", axis_id)),
        }
    }

    let snapshot = load_snapshot(store, product_id).await?;
    let planned = plan(&snapshot, &desired)?;

    tracing::debug!(
        product_id = %product_id,
        tags_to_add = planned.tags.to_add.len(),
        tags_to_remove = planned.tags.to_remove.len(),
        prices_to_add = planned.prices.to_add.len(),
        prices_to_update = planned.prices.to_update.len(),
        prices_to_remove = planned.prices.to_remove.len(),
        "planned reconciliation"
    );

    Ok((snapshot, planned))
}

/// Validate `desired`, then load, plan and apply it for one product.
///
/// The store must wrap the whole call in one transaction: on error, nothing
/// applied through `store` may be committed.
///
/// # Errors
///
/// Everything [`prepare`] returns, plus [`ReconcileError::Store`] tagged
/// with the phase that failed while applying.
pub async fn reconcile<S: CatalogStore>(
    store: &mut S,
    product_id: ProductId,
    desired: &DesiredState,
) -> Result<ReconciliationSummary, ReconcileError> {
    let (snapshot, planned) = prepare(store, product_id, desired).await?;

    apply(store, product_id, &snapshot, &planned).await?;

    let summary = ReconciliationSummary::from_plan(product_id, &planned);
    tracing::info!(
        product_id = %product_id,
        changes = summary.total_changes(),
        unchanged = summary.prices_unchanged,
        "reconciled product variants"
    );
    Ok(summary)
}

/// Apply a plan in its three phases. Never reorder the phases.
async fn apply<S: CatalogStore>(
    store: &mut S,
    product_id: ProductId,
    snapshot: &ProductSnapshot,
    plan: &ReconciliationPlan,
) -> Result<(), ReconcileError> {
    let mut tag_ids: HashMap<(AxisId, String), TagId> = snapshot
        .tags
        .iter()
        .map(|t| ((t.axis_id, t.title.clone()), t.id))
        .collect();

    add_tags(store, product_id, &plan.tags, &mut tag_ids).await?;
    sync_prices(store, product_id, &plan.prices, &tag_ids).await?;
    remove_tags(store, product_id, &plan.tags).await
}

async fn add_tags<S: CatalogStore>(
    store: &mut S,
    product_id: ProductId,
    plan: &TagPlan,
    tag_ids: &mut HashMap<(AxisId, String), TagId>,
) -> Result<(), ReconcileError> {
    for addition in &plan.to_add {
        let tag = store
            .create_tag(product_id, addition.axis_id, &addition.title)
            .await
            .map_err(|e| {
                ReconcileError::store(
                    Phase::AddTags,
                    format!("tag {:?} on variant axis {}", addition.title, addition.axis_id),
                    e,
                )
            })?;
        tracing::debug!(product_id = %product_id, axis_id = %tag.axis_id, title = %tag.title, "created variant tag");
        tag_ids.insert((tag.axis_id, tag.title), tag.id);
    }
    Ok(())
}

async fn sync_prices<S: CatalogStore>(
    store: &mut S,
    product_id: ProductId,
    plan: &PricePlan,
    tag_ids: &HashMap<(AxisId, String), TagId>,
) -> Result<(), ReconcileError> {
    // Stale records are removed before their replacements are created.
    for removal in &plan.to_remove {
        store
            .delete_price_record(removal.record_id)
            .await
            .map_err(|e| {
                ReconcileError::store(Phase::SyncPrices, format!("price record {}", removal.key), e)
            })?;
    }

    for update in &plan.to_update {
        store
            .update_price_record(update.record_id, update.values.price, update.values.stock)
            .await
            .map_err(|e| {
                ReconcileError::store(Phase::SyncPrices, format!("price record {}", update.key), e)
            })?;
    }

    for addition in &plan.to_add {
        let slots = addition
            .slots
            .iter()
            .map(|slot| {
                tag_ids
                    .get(&(slot.axis_id, slot.title.clone()))
                    .copied()
                    .ok_or_else(|| {
                        ReconcileError::not_found(
                            "variant tag",
                            format!("{:?} on variant axis {}", slot.title, slot.axis_id),
                        )
                    })
            })
            .collect::<Result<Vec<TagId>, _>>()?;

        store
            .create_price_record(product_id, &slots, addition.values.price, addition.values.stock)
            .await
            .map_err(|e| {
                ReconcileError::store(Phase::SyncPrices, format!("price record {}", addition.key), e)
            })?;
    }
    Ok(())
}

async fn remove_tags<S: CatalogStore>(
    store: &mut S,
    product_id: ProductId,
    plan: &TagPlan,
) -> Result<(), ReconcileError> {
    if plan.to_remove.is_empty() {
        return Ok(());
    }
    let ids: Vec<TagId> = plan.to_remove.iter().map(|t| t.id).collect();
    let removed = store.delete_tags(product_id, &ids).await.map_err(|e| {
        ReconcileError::store(Phase::RemoveTags, format!("tags of product {product_id}"), e)
    })?;
    tracing::debug!(product_id = %product_id, removed, axes_removed = plan.axes_removed.len(), "removed variant tags");
    Ok(())
}
