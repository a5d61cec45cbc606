//! Storefront CLI - run and inspect log extraction tasks

use clap::Parser;
use storefront_cli::{load_config, logging::init_logging, run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // Flushes the file writer when main returns
    let _guard = init_logging(&config.logging, cli.verbose)?;

    run(cli.command, config, &mut std::io::stdout()).await
}
