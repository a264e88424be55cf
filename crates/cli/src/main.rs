//! Larder CLI - Checkout shell for the Larder storefront backend.
//!
//! # Usage
//!
//! ```bash
//! # Show the current cart
//! larder cart
//!
//! # Price delivery for the current cart
//! larder quote --city Kazan --method courier
//!
//! # Edit the cart and place an order interactively
//! larder shell
//!
//! # Same, answering yes to every confirmation
//! larder shell --yes
//! ```
//!
//! Configuration is read from the environment (see `larder_checkout::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use larder_checkout::{CheckoutConfig, CheckoutSession, FileStore, HttpStoreApi};
use larder_core::DeliveryMethod;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "larder")]
#[command(author, version, about = "Larder checkout shell")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current cart
    Cart,
    /// Calculate delivery for the current cart
    Quote {
        /// Delivery city (ignored for pickup)
        #[arg(short, long, default_value = "")]
        city: String,

        /// Delivery method (`courier`, `pickup`)
        #[arg(short, long, default_value = "courier")]
        method: DeliveryMethod,
    },
    /// Edit the cart and place an order interactively
    Shell {
        /// Answer yes to every confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CheckoutConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    if guard.is_enabled() {
        tracing::info!("Sentry error tracking initialized");
    }

    Some(guard)
}

/// Warnings and errors become Sentry events, info and debug breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout is the shell's output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "larder_cli=info,larder_checkout=warn".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = CheckoutConfig::from_env()?;
    let _sentry_guard = init_sentry(&config);

    let api = HttpStoreApi::new(&config.api)?;
    let store = FileStore::open(&config.state_file)?;
    let session = CheckoutSession::new(api, store, config.session);

    match cli.command {
        Commands::Cart => commands::cart::show(&session).await?,
        Commands::Quote { city, method } => {
            commands::cart::quote(&session, &city, method).await?;
        }
        Commands::Shell { yes } => commands::shell::run(&session, yes).await?,
    }
    Ok(())
}
