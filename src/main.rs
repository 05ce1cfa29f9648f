//! lotwatch - polling collector for vehicle auction listings.
//!
//! Renders an auction listing page in headless Chrome on a fixed interval,
//! extracts every listing and appends one timestamped row per listing to
//! ClickHouse or SQLite.

use lotwatch::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if cli::is_verbose() {
        "lotwatch=debug"
    } else {
        "lotwatch=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    cli::run().await
}
