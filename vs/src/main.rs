//! vs - versionscraper command line
//!
//! Logs into the monitoring service and fetches pages through the throttled
//! request scheduler.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use reqsched::{SchedulerStats, SubmitOptions};
use tracing::info;

use versionscraper::cli::{Cli, Command};
use versionscraper::config::Config;
use versionscraper::report::{FetchOutcome, FetchReport, unique_file_names};
use versionscraper::Client;

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("versionscraper")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Log to file so stdout stays clean for command output
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("vs.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("versionscraper starting: base_url={}", config.service.base_url);

    match cli.command {
        Command::Login => {
            let client = login(&config).await?;
            println!("{} Logged in to {}", "✓".green(), client.base_url().as_str().cyan());
        }
        Command::Fetch {
            paths,
            output,
            priority,
            no_retry,
        } => {
            let failures = fetch(&config, &paths, output.as_deref(), priority, no_retry).await?;
            if failures > 0 {
                eyre::bail!("{} of {} fetches failed", failures, paths.len());
            }
        }
        Command::Config => {
            let yaml = serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
            print!("{}", yaml);
        }
    }

    Ok(())
}

async fn login(config: &Config) -> Result<Client> {
    config.validate().context("Invalid configuration")?;
    let (email, password) = config.service.credentials()?;

    let client = Client::new(config).context("Failed to create client")?;
    client.login(&email, &password).await.context("Login failed")?;
    Ok(client)
}

/// Returns the number of paths that could not be fetched
async fn fetch(config: &Config, paths: &[String], output: Option<&Path>, priority: bool, no_retry: bool) -> Result<usize> {
    let client = login(config).await?;

    if let Some(dir) = output {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    let mut options = SubmitOptions::new();
    if priority {
        options = options.priority();
    }
    if no_retry {
        options = options.no_retry();
    }

    let mut report = FetchReport::start();
    let results = client.fetch_all(paths, options).await;

    let names = unique_file_names(paths);

    for ((path, result), name) in paths.iter().zip(&results).zip(&names) {
        let mut outcome = FetchOutcome::from_result(path, result);
        match result {
            Ok(resp) => {
                if let Some(dir) = output {
                    let file = dir.join(name);
                    fs::write(&file, &resp.body).with_context(|| format!("Failed to write {}", file.display()))?;
                    outcome.file = Some(file);
                }
                println!(
                    "{} {} {} {}",
                    "✓".green(),
                    resp.status.to_string().green(),
                    path,
                    format!("({} bytes)", resp.body.len()).dimmed()
                );
            }
            Err(e) => {
                println!("{} {} {}", "✗".red(), path, e.to_string().red());
            }
        }
        report.outcomes.push(outcome);
    }

    let stats = client.stats().await.ok();
    if let Some(ref stats) = stats {
        print_stats(stats);
    }
    report.finish(stats);

    if let Some(dir) = output {
        let summary = report.write_to(dir)?;
        println!("Summary written to {}", summary.display().to_string().cyan());
    }

    Ok(report.failures())
}

fn print_stats(stats: &SchedulerStats) {
    println!();
    println!("{}", "Scheduler".bold());
    println!("  Submitted: {}", stats.total_submitted);
    println!("  Dispatched: {}", stats.total_dispatched);
    println!("  Retried: {}", stats.total_retried);
    println!(
        "  Resolved: {}  Rejected: {}",
        stats.total_resolved.to_string().green(),
        stats.total_rejected.to_string().red()
    );
    println!("  Cooldowns: {}  Rate limited: {}", stats.cooldowns, stats.rate_limited);
    println!("  Peak in flight: {}", stats.peak_in_flight);
}
