//! Shopkeep CLI - drive a storefront session from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse and fill a guest cart
//! shopkeep product show 64f1c0a2
//! shopkeep cart add 64f1c0a2 -q 2
//! shopkeep cart show
//!
//! # Log in: the guest cart and favorites are merged into the account
//! shopkeep login --token "$TOKEN"
//!
//! # Follow the live analytics counters
//! shopkeep live
//! ```
//!
//! # Commands
//!
//! - `product show` - Show a catalog product
//! - `cart` - Show and edit the cart
//! - `favorites` - List and toggle favorites
//! - `login` / `logout` - Switch between guest and account
//! - `live` - Stream live analytics counters
//!
//! Guest data and the session token live in `SHOPKEEP_DATA_DIR`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use shopkeep_storefront::config::ClientConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod output;

use error::CliError;

#[derive(Parser)]
#[command(name = "shopkeep")]
#[command(author, version, about = "Shopkeep storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up catalog products
    Product {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Show and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// List and toggle favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Log in and merge guest data into the account
    Login {
        /// Bearer token issued by the storefront
        #[arg(short, long)]
        token: String,
    },
    /// Log out and return to a guest session
    Logout,
    /// Stream live analytics counters
    Live {
        /// Stop after this many updates
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// Show a product
    Show { id: String },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart contents and totals
    Show,
    /// Add a product
    Add {
        id: String,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product
    Remove { id: String },
    /// Set the quantity of a line (0 removes it)
    Set { id: String, quantity: u32 },
    /// Empty the cart
    Clear,
    /// Reload the cart from the server
    Sync,
    /// Hand the cart to checkout
    Checkout,
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// List favorites
    List,
    /// Add or remove a favorite
    Toggle { id: String },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            output::print_fatal(&e);
            std::process::exit(2);
        }
    };

    // Must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopkeep_storefront=info,shopkeep_cli=info".into());

    // Logs go to stderr so command output stays clean
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), CliError> {
    let ctx = commands::Context::new(config)?;

    match cli.command {
        Commands::Product { action } => match action {
            ProductAction::Show { id } => commands::product::show(&ctx, &id).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&ctx).await?,
            CartAction::Add { id, quantity } => commands::cart::add(&ctx, &id, quantity).await?,
            CartAction::Remove { id } => commands::cart::remove(&ctx, &id).await?,
            CartAction::Set { id, quantity } => commands::cart::set(&ctx, &id, quantity).await?,
            CartAction::Clear => commands::cart::clear(&ctx).await?,
            CartAction::Sync => commands::cart::sync(&ctx).await?,
            CartAction::Checkout => commands::cart::checkout(&ctx).await?,
        },
        Commands::Favorites { action } => match action {
            FavoritesAction::List => commands::favorites::list(&ctx).await?,
            FavoritesAction::Toggle { id } => commands::favorites::toggle(&ctx, &id).await?,
        },
        Commands::Login { token } => commands::auth::login(&ctx, token).await?,
        Commands::Logout => commands::auth::logout(&ctx).await?,
        Commands::Live { limit } => commands::live::follow(&ctx, limit).await?,
    }
    Ok(())
}
