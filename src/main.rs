//! dispatcher-server entry point.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = line_dispatch::cli::parse_cli();

    // An explicit RUST_LOG always wins; --log-level is the fallback when
    // the environment says nothing.
    let fallback = std::env::var("RUST_LOG").unwrap_or_else(|_| cli.log_level.clone());
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&fallback)))
        .init();

    line_dispatch::cli::run_with_cli(cli).await
}
