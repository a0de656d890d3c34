//! Metrobus status watcher CLI
//!
//! Runs the watcher once, or forever on the configured interval.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use metrobus::{
    error::Result,
    models::{Config, LoggingConfig},
    pipeline::{self, Job, Scheduler, TimeWindowGate},
    services::{NtfyNotifier, PageStatusFetcher},
};

/// Metrobus line status watcher
#[derive(Parser, Debug)]
#[command(
    name = "metrobus",
    version,
    about = "Pushes ntfy notifications when Metrobus line status changes"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Keep running and check every `schedule.interval_minutes`
    #[arg(short, long)]
    scheduled: bool,

    /// Validate configuration and exit
    #[arg(long)]
    check: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let loaded = Config::load(&cli.config);
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| LoggingConfig::default().level);
    init_logging(cli.verbose, &level);

    let mut config = match loaded {
        Ok(config) => {
            log::info!("Loaded configuration from {}", cli.config.display());
            config
        }
        Err(e) => {
            log::warn!(
                "Config load failed from {}: {}. Using defaults.",
                cli.config.display(),
                e
            );
            Config::default()
        }
    };
    config.apply_env()?;

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }
    log::debug!(
        "Notify target: {}:{}",
        config.notify.host,
        config.notify.port
    );

    if cli.check {
        log::info!("Config OK");
        return Ok(());
    }

    let gate = TimeWindowGate::from_config(&config.schedule)?;
    let fetcher = Arc::new(PageStatusFetcher::new(config.fetch.clone())?);
    let notifier = Arc::new(NtfyNotifier::new(config.notify.clone())?);
    let mut job = Job::new(gate, fetcher, notifier);

    if cli.scheduled {
        let scheduler = Scheduler::every_minutes(config.schedule.interval_minutes);
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        };
        scheduler.run_until(&mut job, shutdown).await;
    } else {
        pipeline::run_once(&mut job).await;
    }

    log::info!("Done!");

    Ok(())
}
