//! Persistence boundary the reconciliation engine drives.

use rust_decimal::Decimal;

use crate::catalog::{AxisId, PriceRecord, PriceRecordId, ProductId, TagId, VariantAxis, VariantTag};

/// Transactional record store scoped to a single reconciliation call.
///
/// Every call made through one value of an implementing type must belong to
/// the same transaction; committing or rolling it back is the caller's job.
/// Calls are awaited one at a time, in order.
#[allow(async_fn_in_trait)]
pub trait CatalogStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Confirm the product exists and hold it for exclusive writing until the
    /// transaction ends. Returns `false` if the product does not exist.
    async fn lock_product(&mut self, product_id: ProductId) -> Result<bool, Self::Error>;

    async fn find_axis(&mut self, axis_id: AxisId) -> Result<Option<VariantAxis>, Self::Error>;

    /// All variant tags of the product, across axes.
    async fn list_tags(&mut self, product_id: ProductId) -> Result<Vec<VariantTag>, Self::Error>;

    async fn create_tag(
        &mut self,
        product_id: ProductId,
        axis_id: AxisId,
        title: &str,
    ) -> Result<VariantTag, Self::Error>;

    /// Delete the given tags of the product, returning how many were removed.
    async fn delete_tags(
        &mut self,
        product_id: ProductId,
        tag_ids: &[TagId],
    ) -> Result<u64, Self::Error>;

    async fn list_price_records(
        &mut self,
        product_id: ProductId,
    ) -> Result<Vec<PriceRecord>, Self::Error>;

    /// Create a price record referencing `slots` (at most three tags, stored
    /// in order into slot one, two and three).
    async fn create_price_record(
        &mut self,
        product_id: ProductId,
        slots: &[TagId],
        price: Decimal,
        stock: i64,
    ) -> Result<PriceRecordId, Self::Error>;

    async fn update_price_record(
        &mut self,
        record_id: PriceRecordId,
        price: Decimal,
        stock: i64,
    ) -> Result<(), Self::Error>;

    async fn delete_price_record(&mut self, record_id: PriceRecordId) -> Result<(), Self::Error>;
}
