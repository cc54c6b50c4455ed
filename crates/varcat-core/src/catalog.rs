use std::collections::{BTreeMap, HashMap};
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::combination::{CombinationKey, MAX_AXES, TITLE_DELIMITER};
use crate::desired::{AxisTags, DesiredPrice, DesiredState};

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(
    /// Internal id of a row in `products`.
    ProductId
);
id_newtype!(
    /// Internal id of a row in `variant_axes`.
    AxisId
);
id_newtype!(
    /// Internal id of a row in `product_variant_tags`.
    TagId
);
id_newtype!(
    /// Internal id of a row in `product_variant_prices`.
    PriceRecordId
);

/// A named product dimension such as "Color" or "Size".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantAxis {
    pub id: AxisId,
    pub title: String,
    pub active: bool,
}

/// One option title of an axis attached to a product, e.g. "Red" on "Color".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantTag {
    pub id: TagId,
    pub axis_id: AxisId,
    pub title: String,
}

/// Price and stock carried by a single combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceStock {
    pub price: Decimal,
    pub stock: i64,
}

/// Price/stock data for one combination of a product.
///
/// Slot order carries no meaning; only the set of titles the slots resolve to
/// identifies the combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub id: PriceRecordId,
    pub slots: [Option<TagId>; MAX_AXES],
    pub price: Decimal,
    pub stock: i64,
}

impl PriceRecord {
    #[must_use]
    pub fn price_stock(&self) -> PriceStock {
        PriceStock {
            price: self.price,
            stock: self.stock,
        }
    }

    /// Tag ids of the non-empty slots, in slot order.
    pub fn slot_tags(&self) -> impl Iterator<Item = TagId> + '_ {
        self.slots.iter().flatten().copied()
    }
}

/// Persisted variant/price state of one product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product_id: Option<ProductId>,
    pub tags: Vec<VariantTag>,
    pub price_records: Vec<PriceRecord>,
}

impl ProductSnapshot {
    #[must_use]
    pub fn new(product_id: ProductId, tags: Vec<VariantTag>, price_records: Vec<PriceRecord>) -> Self {
        Self {
            product_id: Some(product_id),
            tags,
            price_records,
        }
    }

    fn tag_titles(&self) -> HashMap<TagId, &str> {
        self.tags.iter().map(|t| (t.id, t.title.as_str())).collect()
    }

    /// Titles reachable through a record's slots, in slot order.
    ///
    /// Slots pointing at tags outside this snapshot are skipped.
    #[must_use]
    pub fn slot_titles(&self, record: &PriceRecord) -> Vec<String> {
        let titles = self.tag_titles();
        record
            .slot_tags()
            .filter_map(|id| titles.get(&id).map(|t| (*t).to_string()))
            .collect()
    }

    /// Combination key of a stored record, built from its non-empty slots.
    #[must_use]
    pub fn record_key(&self, record: &PriceRecord) -> CombinationKey {
        CombinationKey::from_titles(self.slot_titles(record))
    }

    /// Render the persisted state in the desired-state payload format.
    ///
    /// Axes appear in ascending id order with their tags in id order; price
    /// titles list slot titles in slot order with a trailing delimiter.
    #[must_use]
    pub fn to_desired_state(&self) -> DesiredState {
        let mut by_axis: BTreeMap<AxisId, Vec<&VariantTag>> = BTreeMap::new();
        for tag in &self.tags {
            by_axis.entry(tag.axis_id).or_default().push(tag);
        }

        let product_variant = by_axis
            .into_iter()
            .map(|(axis_id, mut tags)| {
                tags.sort_by_key(|t| t.id);
                AxisTags {
                    option: axis_id,
                    tags: tags.into_iter().map(|t| t.title.clone()).collect(),
                }
            })
            .collect();

        let mut records: Vec<&PriceRecord> = self.price_records.iter().collect();
        records.sort_by_key(|r| r.id);

        let product_variant_prices = records
            .into_iter()
            .map(|record| {
                let title: String = self
                    .slot_titles(record)
                    .into_iter()
                    .map(|t| format!("{t}{TITLE_DELIMITER}"))
                    .collect();
                DesiredPrice {
                    title,
                    price: record.price,
                    stock: record.stock,
                }
            })
            .collect();

        DesiredState {
            product_variant,
            product_variant_prices,
        }
    }
}
