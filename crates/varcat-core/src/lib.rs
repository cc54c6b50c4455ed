//! Variant and price reconciliation for a product catalog.
//!
//! Everything in this crate is storage-agnostic. Persistence is reached only
//! through the [`CatalogStore`] trait.

pub mod app_config;
pub mod axes;
pub mod catalog;
pub mod combination;
pub mod config;
pub mod desired;
pub mod error;
pub mod memory;
pub mod reconcile;
pub mod store;

pub use app_config::{AppConfig, Environment};
pub use axes::{load_axes, parse_axes, AxesFile, AxisConfig};
pub use catalog::{
    AxisId, PriceRecord, PriceRecordId, PriceStock, ProductId, ProductSnapshot, TagId,
    VariantAxis, VariantTag,
};
pub use combination::{CombinationKey, MAX_AXES, TITLE_DELIMITER};
pub use config::{load_app_config, load_app_config_from_env};
pub use desired::{AxisTags, DesiredPrice, DesiredState, NormalizedDesired};
pub use error::{ConfigError, ErrorKind, Phase, ReconcileError, StoreError};
pub use memory::{MemoryCatalog, MemoryOp, MemoryStoreError, MemoryTx};
pub use reconcile::{
    load_snapshot, plan, prepare, reconcile, PriceChange, ReconciliationPlan, ReconciliationSummary,
    TagRef,
};
pub use store::CatalogStore;
