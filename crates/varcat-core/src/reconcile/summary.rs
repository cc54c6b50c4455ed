use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{AxisId, ProductId};
use crate::combination::CombinationKey;

use super::tags::TagRef;
use super::ReconciliationPlan;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceChange {
    pub combination: CombinationKey,
    pub price: Decimal,
    pub stock: i64,
}

/// What a reconciliation call changed, reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub product_id: ProductId,
    pub tags_added: Vec<TagRef>,
    pub tags_removed: Vec<TagRef>,
    pub axes_removed: Vec<AxisId>,
    pub prices_added: Vec<PriceChange>,
    pub prices_updated: Vec<PriceChange>,
    pub prices_removed: Vec<CombinationKey>,
    pub prices_unchanged: usize,
}

impl ReconciliationSummary {
    #[must_use]
    pub fn from_plan(product_id: ProductId, plan: &ReconciliationPlan) -> Self {
        Self {
            product_id,
            tags_added: plan.tags.to_add.clone(),
            tags_removed: plan.tags.to_remove.iter().map(TagRef::from).collect(),
            axes_removed: plan.tags.axes_removed.clone(),
            prices_added: plan
                .prices
                .to_add
                .iter()
                .map(|a| PriceChange {
                    combination: a.key.clone(),
                    price: a.values.price,
                    stock: a.values.stock,
                })
                .collect(),
            prices_updated: plan
                .prices
                .to_update
                .iter()
                .map(|u| PriceChange {
                    combination: u.key.clone(),
                    price: u.values.price,
                    stock: u.values.stock,
                })
                .collect(),
            prices_removed: plan.prices.to_remove.iter().map(|r| r.key.clone()).collect(),
            prices_unchanged: plan.prices.unchanged,
        }
    }

    /// Number of tag and price record mutations applied.
    #[must_use]
    pub fn total_changes(&self) -> usize {
        self.tags_added.len()
            + self.tags_removed.len()
            + self.prices_added.len()
            + self.prices_updated.len()
            + self.prices_removed.len()
    }

    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.total_changes() == 0
    }
}
