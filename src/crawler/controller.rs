use chrono::NaiveDate;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, info_span, Instrument};

use crate::browser::BrowserLauncher;
use crate::cli::config::RetrySettings;
use crate::crawler::context::{CrawlContext, LogFailure};
use crate::crawler::date_range::{self, DateRange};
use crate::crawler::extractor::TableLocator;
use crate::crawler::result::CrawlResult;
use crate::crawler::tab::{TabId, TabScope};
use crate::crawler::tab_crawler::TabCrawler;
use crate::error::{CrawlError, Result};

/// How often, and how patiently, a failed crawl is restarted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            delay: Duration::from_millis(settings.delay_ms),
        }
    }
}

/// A successful crawl and the attempt that produced it
#[derive(Debug)]
pub struct CrawlOutcome {
    pub result: CrawlResult,
    pub attempts: u32,
}

/// Runs both tabs in sequence and restarts the whole crawl on any failure
pub struct RunOrchestrator {
    ctx: CrawlContext,
    launcher: Box<dyn BrowserLauncher>,
    locator: Box<dyn TableLocator>,
    policy: RetryPolicy,
    clock: fn() -> NaiveDate,
}

impl RunOrchestrator {
    pub fn new(
        ctx: CrawlContext,
        launcher: Box<dyn BrowserLauncher>,
        locator: Box<dyn TableLocator>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            ctx,
            launcher,
            locator,
            policy,
            clock: date_range::today,
        }
    }

    /// Replace the source of "today"
    #[cfg(test)]
    pub fn with_clock(mut self, clock: fn() -> NaiveDate) -> Self {
        self.clock = clock;
        self
    }

    pub async fn run(&self) -> Result<CrawlOutcome> {
        let mut last_error = String::new();

        for attempt in 1..=self.policy.max_attempts {
            let span = info_span!("attempt", attempt);
            match self.crawl_once().instrument(span).await {
                Ok(result) => {
                    info!(attempts = attempt, rows = result.len(), "Scrape complete");
                    return Ok(CrawlOutcome { result, attempts: attempt });
                }
                Err(CrawlError::Interrupted) => {
                    info!("Scrape interrupted on attempt {}", attempt);
                    return Err(CrawlError::Interrupted);
                }
                Err(e) => {
                    last_error = e.to_string();
                    info!("Failed crawl, attempting again try number: {}", attempt);
                    if attempt < self.policy.max_attempts && !self.policy.delay.is_zero() {
                        tokio::select! {
                            _ = self.ctx.shutdown.triggered() => return Err(CrawlError::Interrupted),
                            _ = sleep(self.policy.delay) => {}
                        }
                    }
                }
            }
        }

        let exhausted: Result<CrawlOutcome> = Err(CrawlError::Exhausted {
            attempts: self.policy.max_attempts,
            last_error,
        });
        let exhausted = exhausted.log_failure(&self.ctx, "main");
        info!("Scrape failed");
        exhausted
    }

    /// One full pass: fresh date range, tab 1 then tab 2, merged
    async fn crawl_once(&self) -> Result<CrawlResult> {
        let range = DateRange::ending_on((self.clock)());
        info!("Crawling announcements from {}", range);

        let crawler = TabCrawler::new(&self.ctx, self.launcher.as_ref(), self.locator.as_ref());
        let mut results = Vec::with_capacity(TabId::ALL.len());
        for id in TabId::ALL {
            let tab = TabScope::new(id, &self.ctx.site);
            results.push(crawler.run(&tab, &range).await?);
        }

        Ok(CrawlResult::merge(results))
    }
}
