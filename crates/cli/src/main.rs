//! Storefront sync CLI - drive a cart/wishlist session from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Add two units of a product in size M
//! sync-cli cart add 665f --size M --quantity 2
//!
//! # Authenticate and pull the remote cart/wishlist
//! sync-cli login --id u-123 --name "Asha" --email asha@example.com
//!
//! # Follow catalog events until Ctrl-C
//! sync-cli watch
//! ```
//!
//! # Commands
//!
//! - `cart` - Show or edit the cart
//! - `wishlist` - Show or toggle wishlist entries
//! - `login` / `logout` / `whoami` - Session identity
//! - `catalog list` - Print the product catalog
//! - `watch` - Apply and print push events as they arrive
//!
//! Every command starts a session against the configured store directory,
//! performs its action, flushes pending pushes, and stops the session.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use storefront_sync::channel::EventHub;
use storefront_sync::remote::HttpRemote;
use storefront_sync::store::FileStore;
use storefront_sync::{Session, SessionDeps, SyncConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "sync-cli")]
#[command(author, version, about = "Storefront cart and wishlist sync tools")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Show or edit the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Authenticate the session and pull remote state
    Login {
        /// User id
        #[arg(long)]
        id: String,

        /// Display name
        #[arg(long, default_value = "")]
        name: String,

        /// Email address
        #[arg(long)]
        email: String,
    },
    /// Forget the identity and clear cart and wishlist
    Logout,
    /// Print the current identity
    Whoami,
    /// Inspect the product catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Follow push events until Ctrl-C
    Watch,
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart
    Show,
    /// Add units of a product
    Add {
        /// Product id
        product: String,

        /// Size
        #[arg(short, long)]
        size: String,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: i64,

        /// Add as a gift line
        #[arg(long)]
        gift: bool,
    },
    /// Set a line's quantity
    SetQty {
        /// Product id
        product: String,

        /// Size
        #[arg(short, long)]
        size: String,

        /// New quantity
        #[arg(allow_hyphen_values = true)]
        quantity: i64,

        /// Target the gift line
        #[arg(long)]
        gift: bool,
    },
    /// Move a line to another size
    SetSize {
        /// Product id
        product: String,

        /// Current size
        #[arg(long)]
        from: String,

        /// New size
        #[arg(long)]
        to: String,

        /// Target the gift line
        #[arg(long)]
        gift: bool,
    },
    /// Remove a line
    Remove {
        /// Product id
        product: String,

        /// Size
        #[arg(short, long)]
        size: String,

        /// Target the gift line
        #[arg(long)]
        gift: bool,
    },
    /// Remove every line
    Clear,
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Print the wishlist
    Show,
    /// Add a product, or remove it if present
    Toggle {
        /// Product id
        product: String,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Print every product
    List,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &SyncConfig) -> Option<sentry::ClientInitGuard> {
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
    let config = match SyncConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    // Logs go to stderr so command output on stdout stays clean
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "storefront_sync=info".into());

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

async fn run(cli: Cli, config: SyncConfig) -> storefront_sync::Result<()> {
    let store = FileStore::open(&config.store_dir, config.store_namespace.as_str())?;
    let remote = Arc::new(HttpRemote::new(&config.remote)?);
    let hub = EventHub::default();

    let session = Session::start(
        SessionDeps {
            store: Arc::new(store),
            remote: remote.clone(),
            catalog_source: remote,
            channel: Arc::new(hub.clone()),
        },
        &config,
    );

    let output = commands::Output::new(cli.json);
    let result = match cli.command {
        Commands::Cart { action } => {
            session.wait_synced().await;
            commands::cart::run(&session, action, &output);
            Ok(())
        }
        Commands::Wishlist { action } => {
            session.wait_synced().await;
            commands::wishlist::run(&session, action, &output);
            Ok(())
        }
        Commands::Login { id, name, email } => {
            commands::account::login(&session, id, name, &email, &output).await
        }
        Commands::Logout => {
            commands::account::logout(&session, &output);
            Ok(())
        }
        Commands::Whoami => {
            commands::account::whoami(&session, &output);
            Ok(())
        }
        Commands::Catalog {
            action: CatalogAction::List,
        } => {
            session.wait_catalog_loaded().await;
            commands::catalog::list(&session, &output);
            Ok(())
        }
        Commands::Watch => commands::catalog::watch(&session, &config, hub, &output).await,
    };

    session.flush().await;
    session.stop();
    result
}
