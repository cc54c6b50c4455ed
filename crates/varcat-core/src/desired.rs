//! Desired-state payload and its validated, canonical form.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{AxisId, PriceStock};
use crate::combination::{CombinationKey, TITLE_DELIMITER};
use crate::error::ReconcileError;

/// Option titles requested for one variant axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisTags {
    /// Variant axis id.
    pub option: AxisId,
    pub tags: Vec<String>,
}

/// Price and stock requested for one combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredPrice {
    /// Slash-delimited combination title, e.g. `"Red/Large/"`.
    pub title: String,
    pub price: Decimal,
    pub stock: i64,
}

/// Target variant/price state for one product, in the client payload shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
    #[serde(default)]
    pub product_variant: Vec<AxisTags>,
    #[serde(default)]
    pub product_variant_prices: Vec<DesiredPrice>,
}

/// Validated desired state keyed by axis id and combination key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedDesired {
    pub axes: BTreeMap<AxisId, BTreeSet<String>>,
    pub prices: BTreeMap<CombinationKey, PriceStock>,
}

impl DesiredState {
    /// Validate the payload shape and canonicalize it.
    ///
    /// Duplicate combinations in the price list are not rejected: the last
    /// entry for a combination wins.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Validation`] for duplicate axis entries,
    /// empty titles, titles containing the delimiter or empty combinations,
    /// and [`ReconcileError::TooManyAxes`] for combinations naming more than
    /// three titles.
    pub fn normalize(&self) -> Result<NormalizedDesired, ReconcileError> {
        let mut axes: BTreeMap<AxisId, BTreeSet<String>> = BTreeMap::new();
        for entry in &self.product_variant {
            let mut titles = BTreeSet::new();
            for title in &entry.tags {
                validate_tag_title(entry.option, title)?;
                titles.insert(title.clone());
            }
            if axes.insert(entry.option, titles).is_some() {
                return Err(ReconcileError::validation(format!(
                    "variant axis {} appears more than once",
                    entry.option
                )));
            }
        }

        let mut prices = BTreeMap::new();
        for entry in &self.product_variant_prices {
            let key = CombinationKey::parse(&entry.title);
            if key.is_empty() {
                return Err(ReconcileError::validation(format!(
                    "combination title {:?} names no variant titles",
                    entry.title
                )));
            }
            if key.exceeds_max_axes() {
                return Err(ReconcileError::TooManyAxes {
                    combination: entry.title.clone(),
                    count: key.len(),
                });
            }
            prices.insert(
                key,
                PriceStock {
                    price: entry.price,
                    stock: entry.stock,
                },
            );
        }

        Ok(NormalizedDesired { axes, prices })
    }
}

fn validate_tag_title(axis: AxisId, title: &str) -> Result<(), ReconcileError> {
    if title.trim().is_empty() {
        return Err(ReconcileError::validation(format!(
            "variant axis {axis} has an empty tag title"
        )));
    }
    if title.contains(TITLE_DELIMITER) {
        return Err(ReconcileError::validation(format!(
            "tag title {title:?} on variant axis {axis} contains '{TITLE_DELIMITER}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn price(title: &str, price: i64, stock: i64) -> DesiredPrice {
        DesiredPrice {
            title: title.to_string(),
            price: Decimal::from(price),
            stock,
        }
    }

    fn axis(id: i64, tags: &[&str]) -> AxisTags {
        AxisTags {
            option: AxisId(id),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
        }
    }

    #[test]
    fn normalize_collapses_duplicate_tag_titles() {
        let state = DesiredState {
            product_variant: vec![axis(1, &["Red", "Blue", "Red"])],
            product_variant_prices: vec![],
        };
        let normalized = state.normalize().expect("valid state");
        assert_eq!(normalized.axes[&AxisId(1)].len(), 2);
    }

    #[test]
    fn normalize_rejects_repeated_axis() {
        let state = DesiredState {
            product_variant: vec![axis(1, &["Red"]), axis(1, &["Blue"])],
            product_variant_prices: vec![],
        };
        let err = state.normalize().expect_err("duplicate axis should fail");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn normalize_rejects_blank_tag() {
        let state = DesiredState {
            product_variant: vec![axis(1, &["  "])],
            product_variant_prices: vec![],
        };
        assert_eq!(
            state.normalize().expect_err("blank tag").kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn normalize_rejects_tag_containing_delimiter() {
        let state = DesiredState {
            product_variant: vec![axis(1, &["Red/Blue"])],
            product_variant_prices: vec![],
        };
        assert_eq!(
            state.normalize().expect_err("delimiter in tag").kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn normalize_rejects_empty_combination() {
        let state = DesiredState {
            product_variant: vec![],
            product_variant_prices: vec![price("//", 1, 1)],
        };
        assert_eq!(
            state.normalize().expect_err("empty combination").kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn normalize_rejects_four_titles() {
        let state = DesiredState {
            product_variant: vec![],
            product_variant_prices: vec![price("A/B/C/D/", 1, 1)],
        };
        let err = state.normalize().expect_err("four titles");
        assert!(matches!(err, ReconcileError::TooManyAxes { count: 4, .. }));
    }

    #[test]
    fn last_duplicate_combination_wins() {
        let state = DesiredState {
            product_variant: vec![],
            product_variant_prices: vec![price("Red/Large/", 10, 1), price("Large/Red/", 20, 2)],
        };
        let normalized = state.normalize().expect("valid state");
        assert_eq!(normalized.prices.len(), 1);
        let entry = normalized.prices[&CombinationKey::parse("Red/Large")];
        assert_eq!(entry.price, Decimal::from(20));
        assert_eq!(entry.stock, 2);
    }

    #[test]
    fn deserializes_legacy_payload() {
        let json = r#"{
            "product_variant": [{"option": 1, "tags": ["Red", "Blue"]}],
            "product_variant_prices": [{"title": "Red/", "price": 10.5, "stock": 3}]
        }"#;
        let state: DesiredState = serde_json::from_str(json).expect("deserialization failed");
        assert_eq!(state.product_variant[0].option, AxisId(1));
        assert_eq!(state.product_variant_prices[0].price, Decimal::new(105, 1));
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let state: DesiredState = serde_json::from_str("{}").expect("deserialization failed");
        assert_eq!(state, DesiredState::default());
    }
}
