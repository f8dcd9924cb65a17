//! `mapscout` command-line shell.
//!
//! Runs one crawl session, prints every progress event as a JSON line on
//! stdout and exports the results to CSV when the session ends.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mapscout_browser::ChromiumLauncher;
use mapscout_core::AppConfig;
use mapscout_crawler::expander::KNOWN_REGIONS;
use mapscout_crawler::{CrawlController, CrawlRequest, ProgressEvent};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "mapscout",
    about = "MapScout - collect business listings from a mapping service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl businesses of a category in a region
    Crawl {
        /// Business category (e.g. "farmacia")
        category: String,
        /// Region to search (e.g. "Lima", "Cusco")
        region: String,
        /// Country appended to every location
        #[arg(long)]
        country: Option<String>,
        /// Stop after this many businesses (0 = no limit)
        #[arg(long)]
        target: Option<u32>,
        /// Show the browser window
        #[arg(long)]
        headed: bool,
        /// Search only the category itself, without synonyms
        #[arg(long)]
        no_expand: bool,
        /// Directory for the CSV export
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },
    /// List the known regions
    Regions,
    /// Print the configuration file path and the effective configuration
    Config {
        /// Write the file configuration (defaults filled in, no env overrides) to disk
        #[arg(long)]
        write: bool,
    },
}

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,mapscout=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::load_with_env().context("failed to load configuration")?;

    match cli.command {
        Commands::Crawl {
            category,
            region,
            country,
            target,
            headed,
            no_expand,
            export_dir,
        } => {
            let mut request = CrawlRequest::new(category, region)
                .headless(config.browser.headless && !headed)
                .expanded(!no_expand);
            request.country = country;
            request.target_count = target;

            let export_dir = match export_dir {
                Some(dir) => dir,
                None => config.export.resolve_output_dir()?,
            };
            crawl(config, request, export_dir).await
        }
        Commands::Regions => {
            for region in KNOWN_REGIONS {
                println!("{region}");
            }
            Ok(())
        }
        Commands::Config { write: false } => {
            println!("# {}", AppConfig::config_path()?.display());
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Config { write: true } => {
            let path = AppConfig::load()
                .context("failed to load configuration file")?
                .save()
                .context("failed to write configuration file")?;
            info!("Configuration written to {}", path.display());
            Ok(())
        }
    }
}

async fn crawl(config: AppConfig, request: CrawlRequest, export_dir: PathBuf) -> Result<()> {
    info!("Starting MapScout v{}", env!("CARGO_PKG_VERSION"));

    let launcher = Arc::new(ChromiumLauncher::new(config.browser.clone()));
    let controller = CrawlController::new(config, launcher);
    let printer = tokio::spawn(print_events(controller.subscribe()));

    controller.start(request)?;

    tokio::select! {
        result = controller.wait() => result?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            warn!("Interrupted, stopping crawl");
            controller.stop().await?;
        }
    }

    let status = controller.status();
    info!("Session ended with {} businesses", status.result_count);

    if status.result_count > 0 {
        let path = controller.export(&export_dir)?;
        info!("Results written to {}", path.display());
    } else {
        warn!("No results to export");
    }

    // Detached extraction tasks may still hold the sink after an abort.
    drop(controller);
    let _ = tokio::time::timeout(Duration::from_secs(2), printer).await;
    Ok(())
}

/// Print events as JSON lines until the channel closes.
async fn print_events(mut rx: broadcast::Receiver<ProgressEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!("Failed to serialize event: {}", e),
            },
            Err(RecvError::Lagged(skipped)) => warn!("Event printer skipped {} events", skipped),
            Err(RecvError::Closed) => break,
        }
    }
}
