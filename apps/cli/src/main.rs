//! Parlance CLI: translate a message or answer it directly.
//!
//! Runs the pipeline once from the command line, or serves it over HTTP.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
