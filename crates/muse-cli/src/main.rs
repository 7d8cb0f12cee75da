//! Muse CLI - browse and like community creations from the terminal

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::common::ApiSettings;
use crate::commands::completions::run_completions;
use crate::commands::feed::{run_feed, run_mine};
use crate::commands::like::run_like;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("muse=warn".parse().expect("valid directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Feed { more, json } => {
            let settings = ApiSettings::resolve(&cli.api)?;
            run_feed(&settings, more, json).await?;
        }
        Commands::Mine { json } => {
            let settings = ApiSettings::resolve(&cli.api)?;
            run_mine(&settings, json).await?;
        }
        Commands::Like { id } => {
            let settings = ApiSettings::resolve(&cli.api)?;
            run_like(&settings, &id).await?;
        }
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}
