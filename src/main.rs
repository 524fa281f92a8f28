//! Audiomark CLI
//!
//! Command-line inspection tools for the annotation core.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use audiomark::cli::{commands, Cli, Commands};
use audiomark::config::Config;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Probe { path } => commands::probe(&path)?,
        Commands::Layout {
            project,
            duration,
            width,
            json,
        } => commands::layout(&config, &project, duration, width, json)?,
        Commands::Ticks { duration, width } => commands::ticks(&config, duration, width)?,
    }
    Ok(())
}
