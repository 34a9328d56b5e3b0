//! Newsreel main entry point
//!
//! This is the command-line interface for the Newsreel feed ingester.

use clap::Parser;
use newsreel::config::{load_config_with_hash, Config};
use newsreel::storage::{open_storage_with_retry, share};
use newsreel::{api, NewsError, Scheduler};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Newsreel: a periodic RSS ingester
///
/// Newsreel polls a list of RSS feeds on a fixed interval, stores every item
/// whose title it has not seen before, and serves the newest items over HTTP.
#[derive(Parser, Debug)]
#[command(name = "newsreel")]
#[command(version)]
#[command(about = "A periodic RSS ingester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be ingested without fetching anything
    #[arg(long, conflicts_with_all = ["stats", "once"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "once"])]
    stats: bool,

    /// Run a single ingestion cycle immediately and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config).await?;
    } else if cli.once {
        handle_once(&config).await?;
    } else {
        handle_run(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("newsreel=info,warn"),
            1 => EnvFilter::new("newsreel=debug,info"),
            2 => EnvFilter::new("newsreel=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Newsreel Dry Run ===\n");

    println!("Feeds ({}):", config.feeds.urls.len());
    for url in &config.feeds.urls {
        println!("  - {}", url);
    }
    println!("  Request period: {:?}", config.feeds.interval());

    println!("\nFetcher:");
    println!("  Timeout: {:?}", config.fetcher.timeout());
    println!("  User agent: {}", config.fetcher.user_agent);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!(
        "  Connect retries: {} ({:?} apart)",
        config.storage.connect_retries,
        config.storage.retry_delay()
    );
    match config.storage.max_consecutive_failures {
        0 => println!("  Liveness limit: disabled"),
        n => println!("  Liveness limit: {} consecutive failed cycles", n),
    }

    println!("\nRead API:");
    println!("  Listen address: {}", config.api.listen_address);
    match &config.api.webapp_dir {
        Some(dir) => println!("  Web app: {}", dir.display()),
        None => println!("  Web app: none"),
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would poll {} feed(s) every {:?}",
        config.feeds.urls.len(),
        config.feeds.interval()
    );
}

/// Handles the --stats mode: shows statistics from the database
async fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use newsreel::report::{load_statistics, print_statistics};

    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage_with_retry(&config.storage).await?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --once mode: a single cycle with no timer and no API
async fn handle_once(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let storage = share(open_storage_with_retry(&config.storage).await?);
    let mut scheduler = Scheduler::from_config(config, storage)?;

    let report = scheduler.run_cycle().await?;

    println!("=== Cycle Report ===\n");
    println!(
        "Feeds: {}/{} succeeded",
        report.feeds_succeeded(),
        report.feeds_total
    );
    for failure in &report.feed_failures {
        println!("  ✗ {}", failure.error);
    }
    println!("Items extracted: {}", report.extracted);
    println!("Items stored: {}", report.stored);
    println!("Items already present: {}", report.skipped());
    if let Some(error) = &report.storage_error {
        println!("Storage error: {}", error);
    }

    Ok(())
}

enum Task {
    Scheduler,
    Api,
}

/// Handles the default mode: scheduler plus read API until a shutdown signal
async fn handle_run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.api.socket_addr()?;
    let storage = share(open_storage_with_retry(&config.storage).await?);

    let mut scheduler = Scheduler::from_config(&config, storage.clone())?;
    let app = api::router(storage, config.api.webapp_dir.as_deref());

    let (cancel_tx, cancel_rx) = watch::channel(false);

    let signal_tx = cancel_tx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, finishing current cycle");
        let _ = signal_tx.send(true);
    });

    let scheduler_cancel = cancel_rx.clone();
    let mut scheduler_task =
        tokio::spawn(async move { scheduler.run(scheduler_cancel).await });
    let mut api_task = tokio::spawn(api::serve(addr, app, cancel_rx));

    // Whichever side stops first takes the other down with it
    let (first, remaining) = tokio::select! {
        result = &mut scheduler_task => (result, Task::Api),
        result = &mut api_task => (result, Task::Scheduler),
    };
    let _ = cancel_tx.send(true);

    let second = match remaining {
        Task::Api => api_task.await,
        Task::Scheduler => scheduler_task.await,
    };

    for result in [first, second] {
        if let Err(e) = result? {
            if let NewsError::StorageUnavailable { consecutive } = &e {
                tracing::error!(
                    "Stopping: storage unreachable for {} consecutive cycles",
                    consecutive
                );
            } else {
                tracing::error!("Stopping: {}", e);
            }
            return Err(e.into());
        }
    }

    tracing::info!("Shut down cleanly");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
