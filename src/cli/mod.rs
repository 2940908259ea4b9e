pub mod commands;
pub mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use crate::error::CrawlError;
use crate::utils::{default_log_file, LogFormat};

/// Exit code when every crawl attempt failed
pub const EXIT_EXHAUSTED: u8 = 4;
/// Exit code for every other failure
pub const EXIT_FAILURE: u8 = 1;

#[derive(Parser)]
#[command(author, version, about = "Crawl daily stock exchange announcements into a CSV file", long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to a file (default location if no path is given)
    #[arg(long, global = true, num_args = 0..=1, value_name = "PATH")]
    pub log_file: Option<Option<PathBuf>>,

    /// Console log format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Resolved log file path, if file logging was requested
    pub fn log_file(&self) -> Option<PathBuf> {
        self.log_file
            .as_ref()
            .map(|path| path.clone().unwrap_or_else(default_log_file))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl both announcement tabs for the previous business day
    Crawl {
        /// Configuration file to use instead of the default one
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output CSV path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Announcements page URL
        #[arg(long)]
        url: Option<String>,

        /// Maximum number of whole-crawl attempts
        #[arg(short, long)]
        attempts: Option<u32>,

        /// Run the browser headless
        #[arg(long, conflicts_with = "no_headless")]
        headless: bool,

        /// Run the browser with a visible window
        #[arg(long)]
        no_headless: bool,

        /// WebDriver server URL
        #[arg(long)]
        webdriver: Option<String>,
    },

    /// Extract announcement rows from a saved page snapshot
    Extract {
        /// Saved HTML of the announcements page
        #[arg(required = true)]
        html: PathBuf,

        /// Tab whose table should be read (1 or 2)
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
        tab: u8,

        /// Write CSV here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration file to use instead of the default one
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show the active configuration
    Config {
        /// Rewrite the default configuration file
        #[arg(long)]
        reset: bool,
    },
}

/// Parse command line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Process the command
pub async fn process_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Crawl {
            config,
            output,
            url,
            attempts,
            headless,
            no_headless,
            webdriver,
        } => {
            let overrides = commands::CrawlOverrides {
                output,
                url,
                attempts,
                headless: match (headless, no_headless) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
                webdriver,
            };
            commands::crawl(config, overrides).await
        }
        Commands::Extract { html, tab, output, config } => {
            info!("Extracting tab {} rows from {}", tab, html.display());
            commands::extract(config, html, tab, output).await
        }
        Commands::Config { reset } => {
            if reset {
                info!("Resetting default configuration");
                commands::reset_config().await
            } else {
                commands::show_config().await
            }
        }
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
pub async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Process exit code for a failed command
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<CrawlError>() {
        Some(CrawlError::Exhausted { .. }) => EXIT_EXHAUSTED,
        _ => EXIT_FAILURE,
    }
}
