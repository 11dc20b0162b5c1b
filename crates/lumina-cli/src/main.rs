use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod ingest;

#[derive(Debug, Parser)]
#[command(name = "lumina")]
#[command(about = "Product aggregation pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Aggregate and store one product, by slug or by id.
    Ingest {
        /// Product slug to ingest.
        slug: Option<String>,
        /// Product id to ingest instead of a slug.
        #[arg(long, conflicts_with = "slug")]
        id: Option<Uuid>,
    },
    /// Aggregate every product in the catalog; per-product failures are
    /// logged and skipped.
    IngestAll,
    /// Run pending database migrations.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = lumina_core::load_app_config_from_env()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let pool = lumina_db::connect_pool(
        &config.database_url,
        lumina_db::PoolConfig {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        },
    )
    .await?;

    match cli.command {
        Commands::Migrate => {
            lumina_db::run_migrations(&pool).await?;
            tracing::info!("migrations complete");
        }
        Commands::Ingest { slug, id } => {
            let product = match (slug, id) {
                (Some(slug), None) => lumina_db::get_product_by_slug(&pool, &slug).await?,
                (None, Some(id)) => lumina_db::get_product_by_id(&pool, id).await?,
                _ => anyhow::bail!("provide a product slug or --id"),
            };
            let runner = ingest::Runner::new(&config)?;
            runner.ingest_one(&pool, &config, &product).await?;
        }
        Commands::IngestAll => {
            let products = lumina_db::list_products(&pool).await?;
            if products.is_empty() {
                tracing::warn!("catalog is empty; nothing to ingest");
                return Ok(());
            }
            let runner = ingest::Runner::new(&config)?;
            let mut failed = 0usize;
            for product in &products {
                if let Err(e) = runner.ingest_one(&pool, &config, product).await {
                    tracing::error!(slug = %product.slug, error = %e, "product ingest failed; continuing");
                    failed += 1;
                }
            }
            tracing::info!(
                total = products.len(),
                failed,
                "catalog ingest complete"
            );
        }
    }

    Ok(())
}
