//! CLI argument parsing for versionscraper

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vs")]
#[command(author, version, about = "Throttled scraping client for a page-monitoring service", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in with the configured credentials
    Login,

    /// Log in, then fetch pages through the request scheduler
    Fetch {
        /// Paths (relative to base-url) or absolute URLs
        #[arg(required = true)]
        paths: Vec<String>,

        /// Directory to write response bodies into
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Queue ahead of already-waiting requests
        #[arg(long)]
        priority: bool,

        /// Fail on the first unsatisfactory response
        #[arg(long)]
        no_retry: bool,
    },

    /// Print the effective configuration
    Config,
}
