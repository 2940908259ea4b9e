use anyhow::{Context, Result};
use std::io;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::browser::{BrowserLauncher, WebDriverLauncher};
use crate::cli::config::CrawlerConfig;
use crate::cli::ctrl_c;
use crate::crawler::extractor::{extract_rows, ScopedTableLocator};
use crate::crawler::{
    shutdown_channel, CrawlContext, CrawlResult, RetryPolicy, RunOrchestrator, ShutdownSignal, TabId, TabScope,
};
use crate::error::CrawlError;
use crate::storage::{write_records, CsvSink};
use crate::utils::OperatorIdentity;

/// Command line values that take precedence over the configuration file
#[derive(Debug, Default)]
pub struct CrawlOverrides {
    pub output: Option<PathBuf>,
    pub url: Option<String>,
    pub attempts: Option<u32>,
    pub headless: Option<bool>,
    pub webdriver: Option<String>,
}

impl CrawlOverrides {
    pub fn apply(self, config: &mut CrawlerConfig) {
        if let Some(output) = self.output {
            config.output.path = output;
        }
        if let Some(url) = self.url {
            config.site.url = url;
        }
        if let Some(attempts) = self.attempts {
            config.retry.max_attempts = attempts;
        }
        if let Some(headless) = self.headless {
            config.browser.headless = headless;
        }
        if let Some(webdriver) = self.webdriver {
            config.browser.webdriver_url = webdriver;
        }
    }
}

/// Crawl both tabs and write the CSV file. Ctrl-C stops the crawl, closes
/// its browser session and leaves any previous output untouched.
pub async fn crawl(config_path: Option<PathBuf>, overrides: CrawlOverrides) -> Result<()> {
    let mut config = CrawlerConfig::load(config_path.as_deref())?;
    overrides.apply(&mut config);
    config.validate()?;

    let operator = OperatorIdentity::detect();
    info!("Scrape started by {}", operator);

    let (trigger, shutdown) = shutdown_channel();
    let listener = tokio::spawn(async move {
        ctrl_c().await;
        info!("Interrupt received, stopping");
        trigger.trigger();
    });

    let launcher = WebDriverLauncher::new(config.browser.clone(), config.waits.poll_interval());
    let outcome = crawl_with(&config, operator, Box::new(launcher), shutdown).await;
    listener.abort();

    match outcome {
        Ok(_) => Ok(()),
        Err(e) if is_interrupted(&e) => {
            info!("Scrape interrupted, no output written");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn is_interrupted(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<CrawlError>(), Some(CrawlError::Interrupted))
}

/// Run the crawl through `launcher` and write the result. Returns the number of rows written.
pub async fn crawl_with(
    config: &CrawlerConfig,
    operator: OperatorIdentity,
    launcher: Box<dyn BrowserLauncher>,
    shutdown: ShutdownSignal,
) -> Result<usize> {
    let ctx = CrawlContext::new(config, operator).with_shutdown(shutdown);
    let locator = ScopedTableLocator::new(&config.site)?;
    let policy = RetryPolicy::from(&config.retry);

    let orchestrator = RunOrchestrator::new(ctx, launcher, Box::new(locator), policy);
    let outcome = orchestrator.run().await?;

    if outcome.result.is_empty() {
        warn!("No announcements found, writing header only");
    }

    let sink = CsvSink::new(&config.output.path);
    let written = sink.write(&outcome.result)?;
    info!(
        rows = written,
        attempts = outcome.attempts,
        "Scrape complete, output written to {}",
        sink.path().display()
    );
    Ok(written)
}

/// Read one tab's table out of a saved page
pub async fn extract(
    config_path: Option<PathBuf>,
    html: PathBuf,
    tab: u8,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = CrawlerConfig::load(config_path.as_deref())?;
    let id = TabId::from_number(tab).context(format!("No such tab: {}", tab))?;
    let scope = TabScope::new(id, &config.site);

    let source = tokio::fs::read_to_string(&html)
        .await
        .context(format!("Failed to read page snapshot: {}", html.display()))?;

    let locator = ScopedTableLocator::new(&config.site)?;
    let rows = extract_rows(&source, &locator, &scope)?;
    let result = CrawlResult::from_rows(rows);

    match output {
        Some(path) => {
            let written = CsvSink::new(&path).write(&result)?;
            info!("Extracted {} rows to {}", written, path.display());
        }
        None => write_records(io::stdout().lock(), result.records())?,
    }

    Ok(())
}

/// Show the current configuration
pub async fn show_config() -> Result<()> {
    let config = CrawlerConfig::load_default()?;
    println!("Configuration file: {}", CrawlerConfig::default_path().display());
    println!(
        "{}",
        serde_yaml::to_string(&config).context("Failed to serialize configuration")?
    );

    Ok(())
}

/// Overwrite the default configuration file with built-in values
pub async fn reset_config() -> Result<()> {
    CrawlerConfig::default().save_as_default()?;
    println!("Default configuration written to {}", CrawlerConfig::default_path().display());

    Ok(())
}
