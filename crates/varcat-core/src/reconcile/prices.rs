//! Diff of a product's price records, matched by combination key.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::catalog::{AxisId, PriceRecord, PriceRecordId, PriceStock, ProductSnapshot};
use crate::combination::{CombinationKey, MAX_AXES};
use crate::desired::NormalizedDesired;
use crate::error::ReconcileError;

use super::tags::{TagPlan, TagRef};

/// A price record to create. `slots` lists the tags to reference, in slot
/// order (ascending axis id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceAddition {
    pub key: CombinationKey,
    pub slots: Vec<TagRef>,
    pub values: PriceStock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceUpdate {
    pub record_id: PriceRecordId,
    pub key: CombinationKey,
    pub previous: PriceStock,
    pub values: PriceStock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRemoval {
    pub record_id: PriceRecordId,
    pub key: CombinationKey,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PricePlan {
    pub to_add: Vec<PriceAddition>,
    pub to_update: Vec<PriceUpdate>,
    pub to_remove: Vec<PriceRemoval>,
    /// Persisting combinations whose price and stock already match.
    pub unchanged: usize,
}

impl PricePlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_remove.is_empty()
    }
}

/// Diff the snapshot's price records against the desired combinations.
///
/// Combinations are resolved against the tags the product will carry once
/// the tag plan is fully applied, i.e. the desired axis titles. A title
/// present on several axes resolves to the lowest axis id.
///
/// A stored record that matches a desired combination is updated in place
/// unless one of its slots points at a tag scheduled for removal, in which
/// case it is removed and recreated against the surviving tags. Stored
/// records that resolve to the same combination as an earlier record (by
/// id) or to no title at all are removed.
///
/// # Errors
///
/// Returns [`ReconcileError::Validation`] when a desired combination names a
/// title that is not a desired tag, or names two titles of the same axis,
/// and [`ReconcileError::TooManyAxes`] when it spans more than three axes.
pub fn plan_prices(
    snapshot: &ProductSnapshot,
    tag_plan: &TagPlan,
    desired: &NormalizedDesired,
) -> Result<PricePlan, ReconcileError> {
    let resolver = TitleResolver::new(desired);
    let removed_tags = tag_plan.removed_ids();

    let mut records: Vec<&PriceRecord> = snapshot.price_records.iter().collect();
    records.sort_by_key(|r| r.id);

    let mut plan = PricePlan::default();
    let mut existing: BTreeMap<CombinationKey, &PriceRecord> = BTreeMap::new();
    for record in records {
        let key = snapshot.record_key(record);
        if key.is_empty() || existing.contains_key(&key) {
            plan.to_remove.push(PriceRemoval {
                record_id: record.id,
                key,
            });
        } else {
            existing.insert(key, record);
        }
    }

    for (key, values) in &desired.prices {
        if key.exceeds_max_axes() {
            return Err(ReconcileError::TooManyAxes {
                combination: key.to_title_string(),
                count: key.len(),
            });
        }
        let slots = resolver.resolve(key)?;

        match existing.get(key) {
            Some(record) if !record.slot_tags().any(|id| removed_tags.contains(&id)) => {
                let previous = record.price_stock();
                if previous == *values {
                    plan.unchanged += 1;
                } else {
                    plan.to_update.push(PriceUpdate {
                        record_id: record.id,
                        key: key.clone(),
                        previous,
                        values: *values,
                    });
                }
            }
            Some(record) => {
                plan.to_remove.push(PriceRemoval {
                    record_id: record.id,
                    key: key.clone(),
                });
                plan.to_add.push(PriceAddition {
                    key: key.clone(),
                    slots,
                    values: *values,
                });
            }
            None => plan.to_add.push(PriceAddition {
                key: key.clone(),
                slots,
                values: *values,
            }),
        }
    }

    for (key, record) in &existing {
        if !desired.prices.contains_key(key) {
            plan.to_remove.push(PriceRemoval {
                record_id: record.id,
                key: key.clone(),
            });
        }
    }

    plan.to_remove.sort_by_key(|r| r.record_id);
    Ok(plan)
}

/// Maps a desired tag title to the axis carrying it.
struct TitleResolver<'a> {
    axes_by_title: HashMap<&'a str, AxisId>,
}

impl<'a> TitleResolver<'a> {
    fn new(desired: &'a NormalizedDesired) -> Self {
        let mut axes_by_title = HashMap::new();
        for (axis_id, titles) in &desired.axes {
            for title in titles {
                axes_by_title.entry(title.as_str()).or_insert(*axis_id);
            }
        }
        Self { axes_by_title }
    }

    fn resolve(&self, key: &CombinationKey) -> Result<Vec<TagRef>, ReconcileError> {
        let mut slots = Vec::with_capacity(MAX_AXES);
        let mut seen_axes = BTreeSet::new();
        for title in key.titles() {
            let axis_id = self.axes_by_title.get(title.as_str()).ok_or_else(|| {
                ReconcileError::validation(format!(
                    "combination {key} references {title:?}, which is not a variant tag of the product"
                ))
            })?;
            if !seen_axes.insert(*axis_id) {
                return Err(ReconcileError::validation(format!(
                    "combination {key} names more than one title of variant axis {axis_id}"
                )));
            }
            slots.push(TagRef::new(*axis_id, title.clone()));
        }
        if slots.len() > MAX_AXES {
            return Err(ReconcileError::TooManyAxes {
                combination: key.to_title_string(),
                count: slots.len(),
            });
        }
        slots.sort();
        Ok(slots)
    }
}
