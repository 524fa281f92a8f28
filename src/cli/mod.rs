//! CLI Module
//!
//! Inspection commands for audio files and marker projects.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Audiomark - audio annotation timeline tools
#[derive(Parser, Debug)]
#[command(name = "audiomark")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that a file is an accepted audio source
    #[command(name = "probe")]
    Probe {
        /// Audio file to check
        path: PathBuf,
    },

    /// Print the lane layout of a project's markers
    #[command(name = "layout")]
    Layout {
        /// Project JSON file
        project: PathBuf,

        /// Audio duration in seconds
        #[arg(short, long)]
        duration: f64,

        /// Drawing surface width in pixels
        #[arg(short, long, default_value_t = 1000.0)]
        width: f64,

        /// Emit the layout as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the time axis for a duration
    #[command(name = "ticks")]
    Ticks {
        /// Audio duration in seconds
        #[arg(short, long)]
        duration: f64,

        /// Drawing surface width in pixels
        #[arg(short, long, default_value_t = 1000.0)]
        width: f64,
    },
}
