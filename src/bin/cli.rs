//! Frontier poller CLI
//!
//! Drains due URLs from a local status document file and prints them as
//! JSON lines, one crawl item per line.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use frontier_poller::{
    error::Result,
    models::Config,
    pipeline::FrontierPoller,
    storage::{AckSink, InFlight, InFlightRegistry, LocalConnector},
};

/// frontier - poll due URLs from a status store
#[derive(Parser, Debug)]
#[command(name = "frontier", version, about = "Crawl frontier poller")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Emit due items until the frontier runs dry
    Poll {
        /// Status document file (overrides store.path)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Stop after emitting this many items
        #[arg(short = 'n', long, default_value_t = 100)]
        max_items: usize,

        /// Consecutive empty ticks before stopping
        #[arg(long, default_value_t = 3)]
        idle_ticks: usize,

        /// Delay between empty ticks in milliseconds
        #[arg(long, default_value_t = 200)]
        tick_ms: u64,

        /// Acknowledge emitted items as failed instead of successful
        #[arg(long)]
        fail: bool,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);

    match cli.command {
        Command::Validate => {
            config.validate()?;
            log::info!("Configuration at {} is valid", cli.config.display());
        }

        Command::Poll {
            store,
            max_items,
            idle_ticks,
            tick_ms,
            fail,
        } => {
            if let Some(path) = store {
                config.store.path = path;
            }

            let registry = Arc::new(InFlightRegistry::new());
            let mut poller = FrontierPoller::open(
                &config,
                &LocalConnector::new(),
                Arc::clone(&registry) as Arc<dyn InFlight>,
                Arc::clone(&registry) as Arc<dyn AckSink>,
            )
            .await?;

            let mut emitted = Vec::new();
            let mut idle = 0;
            while emitted.len() < max_items && idle < idle_ticks {
                match poller.next_item().await {
                    Some(item) => {
                        idle = 0;
                        registry.mark_in_progress(&item.url);
                        println!("{}", serde_json::to_string(&item)?);
                        emitted.push(item.url);
                    }
                    None => {
                        idle += 1;
                        tokio::time::sleep(Duration::from_millis(tick_ms)).await;
                    }
                }
            }

            for url in &emitted {
                if fail {
                    poller.on_ack_failure(url);
                } else {
                    poller.on_ack_success(url);
                }
            }

            log::info!(
                "Emitted {} items, average query time {:?}",
                emitted.len(),
                poller.query_times().average().unwrap_or_default()
            );
            poller.close().await;
        }
    }

    Ok(())
}
