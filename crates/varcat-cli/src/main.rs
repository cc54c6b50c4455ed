mod db;
mod product;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use product::ProductCommands;

#[derive(Debug, Parser)]
#[command(name = "varcat-cli")]
#[command(about = "Product variant and price reconciliation")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// List active variant axes
    Axes,
    /// Create, inspect and reconcile products
    Product {
        #[command(subcommand)]
        command: ProductCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Upsert variant axes from the axes config file
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("varcat-cli ready; run with --help for commands");
        return Ok(());
    };

    let config = varcat_core::load_app_config()?;
    init_tracing(&config.log_level);
    tracing::debug!(env = %config.env, "loaded configuration");

    let pool = varcat_db::connect_pool(
        &config.database_url,
        varcat_db::PoolConfig::from_app_config(&config),
    )
    .await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => db::run_db_ping(&pool).await?,
            DbCommands::Migrate => db::run_db_migrate(&pool).await?,
            DbCommands::Seed => db::run_db_seed(&pool, &config).await?,
        },
        Commands::Axes => db::run_axes_list(&pool).await?,
        Commands::Product { command } => match command {
            ProductCommands::Create {
                title,
                sku,
                description,
            } => product::run_product_create(&pool, &title, &sku, description.as_deref()).await?,
            ProductCommands::Show { id } => product::run_product_show(&pool, id).await?,
            ProductCommands::Reconcile { id, file, dry_run } => {
                product::run_product_reconcile(&pool, id, &file, dry_run).await?;
            }
        },
    }

    Ok(())
}

/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(log_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
