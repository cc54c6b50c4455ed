//! Per-axis diff of the variant tags attached to a product.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::catalog::{AxisId, ProductSnapshot, TagId, VariantTag};
use crate::desired::NormalizedDesired;

/// A tag to create: one option title on one axis.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagRef {
    pub axis_id: AxisId,
    pub title: String,
}

impl TagRef {
    pub fn new(axis_id: AxisId, title: impl Into<String>) -> Self {
        Self {
            axis_id,
            title: title.into(),
        }
    }
}

impl From<&VariantTag> for TagRef {
    fn from(tag: &VariantTag) -> Self {
        Self::new(tag.axis_id, tag.title.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPlan {
    /// Tags to create in phase (a), ordered by axis then title.
    pub to_add: Vec<TagRef>,
    /// Tags to delete in phase (c), ordered by id. Includes every tag of a
    /// removed axis.
    pub to_remove: Vec<VariantTag>,
    /// Axes with existing tags that are absent from the desired state.
    pub axes_removed: Vec<AxisId>,
}

impl TagPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    #[must_use]
    pub fn removed_ids(&self) -> BTreeSet<TagId> {
        self.to_remove.iter().map(|t| t.id).collect()
    }
}

/// Diff the snapshot's tags against the desired axis titles.
///
/// Axis existence is not checked here; the orchestrator resolves every
/// desired axis against the store before planning.
#[must_use]
pub fn plan_tags(snapshot: &ProductSnapshot, desired: &NormalizedDesired) -> TagPlan {
    let mut existing: BTreeMap<AxisId, Vec<&VariantTag>> = BTreeMap::new();
    for tag in &snapshot.tags {
        existing.entry(tag.axis_id).or_default().push(tag);
    }

    let mut plan = TagPlan::default();

    for (axis_id, titles) in &desired.axes {
        let current = existing.get(axis_id).map(Vec::as_slice).unwrap_or_default();
        let current_titles: BTreeSet<&str> = current.iter().map(|t| t.title.as_str()).collect();

        plan.to_add.extend(
            titles
                .iter()
                .filter(|title| !current_titles.contains(title.as_str()))
                .map(|title| TagRef::new(*axis_id, title.clone())),
        );
        plan.to_remove.extend(
            current
                .iter()
                .filter(|tag| !titles.contains(&tag.title))
                .map(|tag| (*tag).clone()),
        );
    }

    for (axis_id, tags) in &existing {
        if !desired.axes.contains_key(axis_id) {
            plan.axes_removed.push(*axis_id);
            plan.to_remove.extend(tags.iter().map(|tag| (*tag).clone()));
        }
    }

    plan.to_remove.sort_by_key(|t| t.id);
    plan
}
