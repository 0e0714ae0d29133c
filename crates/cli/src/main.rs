use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use qta_runner::Runner;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let runner = Runner::parse();
    runner.execute().await
}
