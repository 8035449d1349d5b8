use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use voicenav::cli::{parse_args, run_cli_command};
use voicenav::config::AppConfig;

const DEFAULT_LOG_FILTER: &str = "voicenav=info";

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // stdout is reserved for command output
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    let command = parse_args(std::env::args());
    let config = AppConfig::from_env();
    tracing::debug!(?command, ?config, "Starting");

    run_cli_command(command, &config).await
}
