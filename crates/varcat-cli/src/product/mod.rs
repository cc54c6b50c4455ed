//! Product command handlers for the CLI.
//!
//! These are called from `main` after the database pool and config are
//! established. `reconcile` is the only subcommand that writes variant data.

mod query;
pub(crate) mod reconcile;

use std::path::PathBuf;

use clap::Subcommand;

pub(crate) use query::{run_product_create, run_product_show};
pub(crate) use reconcile::run_product_reconcile;

/// Sub-commands available under `product`.
#[derive(Debug, Subcommand)]
pub enum ProductCommands {
    /// Create a product with no variants
    Create {
        #[arg(long)]
        title: String,
        /// Unique stock keeping unit
        #[arg(long)]
        sku: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Print a product's variant tags and prices as a desired-state document
    Show {
        #[arg(long)]
        id: i64,
    },
    /// Reconcile a product's variants against a desired-state JSON file
    Reconcile {
        #[arg(long)]
        id: i64,
        /// Path to the desired-state JSON document
        #[arg(long)]
        file: PathBuf,
        /// Print the planned changes without writing them
        #[arg(long)]
        dry_run: bool,
    },
}
