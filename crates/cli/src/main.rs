//! VIX CLI - storefront and admin back-office from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! vix catalog
//! vix catalog --category jackets
//! vix catalog --search leather
//!
//! # Place a cash-on-delivery order (product 1, black, size M, two units)
//! vix order --name "Mona Adel" --phone 01012345678 --address "12 Tahrir St, Cairo" \
//!     --item '1:#000000:M*2' --item 2
//!
//! # Admin back-office
//! vix admin login --username admin --password '...' --secret '...'
//! vix admin orders --status pending --date week
//! vix admin order-status 17 shipped
//! vix admin logout
//! ```
//!
//! # Commands
//!
//! - `catalog` - List products (store first, then cache, then defaults)
//! - `order` - Place an order
//! - `admin` - Product and order management (requires `admin login`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vix_storefront::AppState;
use vix_storefront::config::StoreConfig;

mod commands;

use commands::admin::AdminAction;
use commands::order::ItemSpec;

#[derive(Parser)]
#[command(name = "vix")]
#[command(author, version, about = "VIX store CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Catalog {
        /// Only products in this category
        #[arg(short, long)]
        category: Option<String>,

        /// Case-insensitive search over name and description
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Place a cash-on-delivery order
    Order {
        /// Customer name
        #[arg(short, long)]
        name: String,

        /// Egyptian mobile number (010/011/012/015, 11 digits)
        #[arg(short, long)]
        phone: String,

        /// Delivery address
        #[arg(short, long)]
        address: String,

        /// Delivery notes
        #[arg(long, default_value = "")]
        notes: String,

        /// Item as `<product_id>[:<color>[:<size>]][*<qty>]`, repeatable
        #[arg(short, long = "item", required = true)]
        items: Vec<ItemSpec>,
    },
    /// Admin back-office
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

fn init_sentry(config: &StoreConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Map tracing levels to Sentry: warnings and errors become events,
/// info and debug become breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // Load configuration from environment (needed for Sentry init)
    let config = StoreConfig::from_env();

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vix_storefront=info,vix_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut state = AppState::from_config(config)?;

    match cli.command {
        Commands::Catalog { category, search } => {
            commands::catalog::list(&mut state, category.as_deref(), search.as_deref()).await;
        }
        Commands::Order {
            name,
            phone,
            address,
            notes,
            items,
        } => {
            let customer = vix_storefront::checkout::CustomerInfo {
                name,
                phone,
                address,
                notes,
            };
            commands::order::place(&mut state, customer, &items).await?;
        }
        Commands::Admin { action } => commands::admin::run(&mut state, action).await?,
    }
    Ok(())
}
