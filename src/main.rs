use clap::Parser;
use delegated_payments::{
    cli::{self, Cli},
    errors::Result,
};
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; DATABASE_URL may also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Parse arguments and run the requested step
    let cli = Cli::parse();
    cli::run(cli)
        .await
        .inspect(|()| info!("Step completed successfully."))
        .inspect_err(|e| error!("Step failed: {}", e))
}
