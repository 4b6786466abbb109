#[macro_use]
extern crate rust_i18n;

mod commands;
mod shutdown;
mod startup;

use execumate::{components, config, error, utils};
use tracing::info;

// Initialize i18n
i18n!("locales", fallback = "en");

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting ExecuMate");

    // Load configuration
    let config = startup::load_config().await?;

    // Start the bot
    startup::start_bot(config).await
}
