//! Inbox server entry point
//!
//! Run with:
//! ```bash
//! STORAGE_BACKEND=memory JWT_SECRET=dev cargo run -p inbox-api
//! ```
//!
//! Configuration is read from the environment (and `.env` when present).

use anyhow::Context;
use inbox_common::{try_init_tracing, AppConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %format!("{e:#}"), "Server failed");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;

    info!(
        env = ?config.app.env,
        address = %config.server.address(),
        "Configuration loaded"
    );

    inbox_api::run(config).await?;
    Ok(())
}
