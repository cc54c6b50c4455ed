//! In-memory [`CatalogStore`] with commit/rollback semantics.
//!
//! [`MemoryCatalog::begin`] hands out a [`MemoryTx`] working on a copy of the
//! catalog; the copy replaces the catalog only on [`MemoryTx::commit`].
//! Dropping the transaction discards every change made through it.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use thiserror::Error;

use crate::catalog::{
    AxisId, PriceRecord, PriceRecordId, ProductId, ProductSnapshot, TagId, VariantAxis, VariantTag,
};
use crate::combination::MAX_AXES;
use crate::desired::DesiredState;
use crate::error::ReconcileError;
use crate::reconcile::{reconcile, ReconciliationSummary};
use crate::store::CatalogStore;

/// Store operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MemoryOp {
    CreateTag,
    DeleteTags,
    CreatePriceRecord,
    UpdatePriceRecord,
    DeletePriceRecord,
}

#[derive(Debug, Error)]
pub enum MemoryStoreError {
    #[error("injected failure on {op:?} call #{call}")]
    Injected { op: MemoryOp, call: usize },

    #[error("tag {title:?} already exists on variant axis {axis_id}")]
    DuplicateTag { axis_id: AxisId, title: String },

    #[error("{0} not found")]
    Missing(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct MemoryState {
    axes: BTreeMap<AxisId, VariantAxis>,
    products: BTreeSet<ProductId>,
    tags: BTreeMap<TagId, (ProductId, VariantTag)>,
    records: BTreeMap<PriceRecordId, (ProductId, PriceRecord)>,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    state: MemoryState,
    failures: BTreeMap<MemoryOp, usize>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_axis(&mut self, title: &str) -> AxisId {
        let id = AxisId(self.state.next_id());
        self.state.axes.insert(
            id,
            VariantAxis {
                id,
                title: title.to_string(),
                active: true,
            },
        );
        id
    }

    pub fn add_product(&mut self) -> ProductId {
        let id = ProductId(self.state.next_id());
        self.state.products.insert(id);
        id
    }

    /// Make the `after + 1`-th call of `op` in every later transaction fail.
    pub fn fail_on(&mut self, op: MemoryOp, after: usize) {
        self.failures.insert(op, after);
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    pub fn begin(&mut self) -> MemoryTx<'_> {
        MemoryTx {
            working: self.state.clone(),
            calls: BTreeMap::new(),
            catalog: self,
        }
    }

    /// Committed tags and price records of a product.
    #[must_use]
    pub fn snapshot(&self, product_id: ProductId) -> ProductSnapshot {
        snapshot_of(&self.state, product_id)
    }

    /// Run one reconciliation in its own transaction, committing on success.
    ///
    /// # Errors
    ///
    /// Returns the [`ReconcileError`] of the failed call; nothing is
    /// committed in that case.
    pub async fn reconcile(
        &mut self,
        product_id: ProductId,
        desired: &DesiredState,
    ) -> Result<ReconciliationSummary, ReconcileError> {
        let mut tx = self.begin();
        let summary = reconcile(&mut tx, product_id, desired).await?;
        tx.commit();
        Ok(summary)
    }
}

fn snapshot_of(state: &MemoryState, product_id: ProductId) -> ProductSnapshot {
    let tags = state
        .tags
        .values()
        .filter(|(owner, _)| *owner == product_id)
        .map(|(_, tag)| tag.clone())
        .collect();
    let records = state
        .records
        .values()
        .filter(|(owner, _)| *owner == product_id)
        .map(|(_, record)| record.clone())
        .collect();
    ProductSnapshot::new(product_id, tags, records)
}

/// One transaction over a [`MemoryCatalog`].
pub struct MemoryTx<'a> {
    catalog: &'a mut MemoryCatalog,
    working: MemoryState,
    calls: BTreeMap<MemoryOp, usize>,
}

impl MemoryTx<'_> {
    pub fn commit(self) {
        self.catalog.state = self.working;
    }

    fn check(&mut self, op: MemoryOp) -> Result<(), MemoryStoreError> {
        let call = self.calls.entry(op).or_insert(0);
        *call += 1;
        match self.catalog.failures.get(&op) {
            Some(after) if *call > *after => Err(MemoryStoreError::Injected { op, call: *call }),
            _ => Ok(()),
        }
    }
}

impl CatalogStore for MemoryTx<'_> {
    type Error = MemoryStoreError;

    async fn lock_product(&mut self, product_id: ProductId) -> Result<bool, Self::Error> {
        Ok(self.working.products.contains(&product_id))
    }

    async fn find_axis(&mut self, axis_id: AxisId) -> Result<Option<VariantAxis>, Self::Error> {
        Ok(self.working.axes.get(&axis_id).cloned())
    }

    async fn list_tags(&mut self, product_id: ProductId) -> Result<Vec<VariantTag>, Self::Error> {
        Ok(snapshot_of(&self.working, product_id).tags)
    }

    async fn create_tag(
        &mut self,
        product_id: ProductId,
        axis_id: AxisId,
        title: &str,
    ) -> Result<VariantTag, Self::Error> {
        self.check(MemoryOp::CreateTag)?;
        let duplicate = self
            .working
            .tags
            .values()
            .any(|(owner, t)| *owner == product_id && t.axis_id == axis_id && t.title == title);
        if duplicate {
            return Err(MemoryStoreError::DuplicateTag {
                axis_id,
                title: title.to_string(),
            });
        }
        let tag = VariantTag {
            id: TagId(self.working.next_id()),
            axis_id,
            title: title.to_string(),
        };
        self.working.tags.insert(tag.id, (product_id, tag.clone()));
        Ok(tag)
    }

    async fn delete_tags(
        &mut self,
        product_id: ProductId,
        tag_ids: &[TagId],
    ) -> Result<u64, Self::Error> {
        self.check(MemoryOp::DeleteTags)?;
        let mut removed = 0;
        for id in tag_ids {
            if matches!(self.working.tags.get(id), Some((owner, _)) if *owner == product_id) {
                self.working.tags.remove(id);
                removed += 1;
            }
        }
        // Slots pointing at deleted tags are emptied.
        let ids: BTreeSet<&TagId> = tag_ids.iter().collect();
        for (_, record) in self.working.records.values_mut() {
            for slot in &mut record.slots {
                if slot.as_ref().is_some_and(|id| ids.contains(id)) {
                    *slot = None;
                }
            }
        }
        Ok(removed)
    }

    async fn list_price_records(
        &mut self,
        product_id: ProductId,
    ) -> Result<Vec<PriceRecord>, Self::Error> {
        Ok(snapshot_of(&self.working, product_id).price_records)
    }

    async fn create_price_record(
        &mut self,
        product_id: ProductId,
        slots: &[TagId],
        price: Decimal,
        stock: i64,
    ) -> Result<PriceRecordId, Self::Error> {
        self.check(MemoryOp::CreatePriceRecord)?;
        debug_assert!(slots.len() <= MAX_AXES, "planner emits at most {MAX_AXES} slots");
        let mut slot_array = [None; MAX_AXES];
        for (slot, tag_id) in slot_array.iter_mut().zip(slots) {
            if !self.working.tags.contains_key(tag_id) {
                return Err(MemoryStoreError::Missing(format!("variant tag {tag_id}")));
            }
            *slot = Some(*tag_id);
        }
        let id = PriceRecordId(self.working.next_id());
        self.working.records.insert(
            id,
            (
                product_id,
                PriceRecord {
                    id,
                    slots: slot_array,
                    price,
                    stock,
                },
            ),
        );
        Ok(id)
    }

    async fn update_price_record(
        &mut self,
        record_id: PriceRecordId,
        price: Decimal,
        stock: i64,
    ) -> Result<(), Self::Error> {
        self.check(MemoryOp::UpdatePriceRecord)?;
        let (_, record) = self
            .working
            .records
            .get_mut(&record_id)
            .ok_or_else(|| MemoryStoreError::Missing(format!("price record {record_id}")))?;
        record.price = price;
        record.stock = stock;
        Ok(())
    }

    async fn delete_price_record(&mut self, record_id: PriceRecordId) -> Result<(), Self::Error> {
        self.check(MemoryOp::DeletePriceRecord)?;
        self.working
            .records
            .remove(&record_id)
            .map(|_| ())
            .ok_or_else(|| MemoryStoreError::Missing(format!("price record {record_id}")))
    }
}
