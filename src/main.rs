use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use http::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use storefront::cart::{CartStore, FavoritesStore, ProductSnapshot};
use storefront::clock::SystemClock;
use storefront::config::StorefrontConfig;
use storefront::ratelimit::{LimitPolicy, RateLimiterRegistry};
use storefront::storage::{FileStorage, StorageBackend};

/// Inspect and drive the storefront cart, favorites and rate limiters.
#[derive(Debug, Parser)]
#[command(name = "storefront", version, about, long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "STOREFRONT_CONFIG")]
    config: Option<PathBuf>,

    /// Override the storage directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Shopping cart operations
    #[command(subcommand)]
    Cart(CartCommand),
    /// Favorite product operations
    #[command(subcommand)]
    Favorites(FavoritesCommand),
    /// Rate limit policies
    #[command(subcommand)]
    Limits(LimitsCommand),
}

#[derive(Debug, Subcommand)]
enum CartCommand {
    /// Print the cart line items
    List,
    /// Add a product to the cart
    Add {
        /// Product id
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: Decimal,
        #[arg(long)]
        original_price: Option<Decimal>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set the quantity of a line; zero or less removes it
    Update {
        id: String,
        #[arg(allow_hyphen_values = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove { id: String },
    /// Empty the cart
    Clear,
    /// Print cart totals
    Summary,
}

#[derive(Debug, Subcommand)]
enum FavoritesCommand {
    /// Print favorited product ids
    List,
    /// Flip the favorite state of a product
    Toggle { id: String },
    /// Remove every favorite
    Clear,
}

#[derive(Debug, Subcommand)]
enum LimitsCommand {
    /// Print the policy table
    Show,
    /// Run a burst of requests from one client through a policy
    Simulate {
        #[arg(long, default_value = "api")]
        policy: LimitPolicy,
        /// Client address sent as X-Forwarded-For
        #[arg(long, default_value = "127.0.0.1")]
        client: String,
        #[arg(short = 'n', long, default_value_t = 10)]
        requests: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = StorefrontConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = dir;
    }
    debug!(config = ?config, "Configuration loaded");

    let backend: Arc<dyn StorageBackend> = Arc::new(FileStorage::new(&config.storage.data_dir));

    match cli.command {
        Command::Cart(command) => run_cart(command, &config, backend)?,
        Command::Favorites(command) => run_favorites(command, &config, backend),
        Command::Limits(command) => run_limits(command, &config).await?,
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run_cart(
    command: CartCommand,
    config: &StorefrontConfig,
    backend: Arc<dyn StorageBackend>,
) -> anyhow::Result<()> {
    let mut cart = CartStore::with_options(
        backend,
        &config.storage.cart_key,
        config.pricing.clone(),
        Arc::new(SystemClock),
    );

    let items = match command {
        CartCommand::List => cart.get_cart(),
        CartCommand::Add {
            id,
            name,
            price,
            original_price,
            image,
            category,
            quantity,
        } => {
            let mut product = ProductSnapshot::new(id, name, price);
            product.original_price = original_price;
            product.image = image;
            product.category = category;
            cart.add_to_cart(&product, quantity)
        }
        CartCommand::Update { id, quantity } => cart.update_quantity(&id, quantity),
        CartCommand::Remove { id } => cart.remove_from_cart(&id),
        CartCommand::Clear => cart.clear_cart(),
        CartCommand::Summary => {
            println!("{}", serde_json::to_string_pretty(&cart.summary())?);
            return Ok(());
        }
    };

    println!("{}", serde_json::to_string_pretty(items)?);
    Ok(())
}

fn run_favorites(command: FavoritesCommand, config: &StorefrontConfig, backend: Arc<dyn StorageBackend>) {
    let mut favorites = FavoritesStore::with_key(backend, &config.storage.favorites_key);

    match command {
        FavoritesCommand::List => {}
        FavoritesCommand::Toggle { id } => {
            let now_favorite = favorites.toggle(&id);
            info!(product_id = %id, favorite = now_favorite, "Toggled favorite");
        }
        FavoritesCommand::Clear => favorites.clear(),
    }

    for id in favorites.favorites() {
        println!("{id}");
    }
}

async fn run_limits(command: LimitsCommand, config: &StorefrontConfig) -> anyhow::Result<()> {
    match command {
        LimitsCommand::Show => {
            for policy in LimitPolicy::ALL {
                let rule = config.rate_limits.rule(policy);
                println!(
                    "{:<16} {:>6} requests / {:>8} ms  {}",
                    policy.as_str(),
                    rule.max_requests,
                    rule.window_ms,
                    rule.message()
                );
            }
        }
        LimitsCommand::Simulate {
            policy,
            client,
            requests,
        } => {
            let registry = RateLimiterRegistry::from_rules(&config.rate_limits);

            let mut headers = HeaderMap::new();
            headers.insert(
                "x-forwarded-for",
                HeaderValue::from_str(&client).context("Client address is not a valid header value")?,
            );

            for n in 1..=requests {
                let decision = registry.check(policy, &headers).await;
                match decision.rejection() {
                    None => println!(
                        "#{n:<4} allowed  remaining={} reset={}",
                        decision.remaining, decision.reset_time
                    ),
                    Some(rejection) => println!(
                        "#{n:<4} {}  {}",
                        rejection.status,
                        serde_json::to_string(&rejection.body)?
                    ),
                }
            }
        }
    }
    Ok(())
}
