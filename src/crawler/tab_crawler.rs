use tracing::{info, info_span, warn, Instrument};

use crate::browser::{Browser, BrowserLauncher};
use crate::crawler::context::{CrawlContext, LogFailure};
use crate::crawler::date_range::DateRange;
use crate::crawler::extractor::{RowExtractor, TableLocator};
use crate::crawler::filter::DateFilterSetter;
use crate::crawler::navigator::PageNavigator;
use crate::crawler::pagination::{PageState, PaginationController};
use crate::crawler::result::TabResult;
use crate::crawler::tab::TabScope;
use crate::error::{CrawlError, Result};

/// Crawls every page of one tab in its own browser session
pub struct TabCrawler<'a> {
    ctx: &'a CrawlContext,
    launcher: &'a dyn BrowserLauncher,
    locator: &'a dyn TableLocator,
}

impl<'a> TabCrawler<'a> {
    pub fn new(ctx: &'a CrawlContext, launcher: &'a dyn BrowserLauncher, locator: &'a dyn TableLocator) -> Self {
        Self { ctx, launcher, locator }
    }

    /// Crawl `tab` for `range`. The session is closed whether the crawl
    /// succeeds, fails or is interrupted.
    pub async fn run(&self, tab: &TabScope, range: &DateRange) -> Result<TabResult> {
        let span = info_span!("tab", tab = %tab.label());
        async {
            self.ctx.shutdown.check()?;
            info!("Starting {} tab", tab.label());

            let browser = self
                .launcher
                .launch()
                .await
                .log_failure(self.ctx, "create_webdriver_instance")?;

            let result = tokio::select! {
                biased;
                _ = self.ctx.shutdown.triggered() => Err(CrawlError::Interrupted),
                result = self.crawl(browser.as_ref(), tab, range) => result,
            };

            if matches!(result, Err(CrawlError::Interrupted)) {
                info!("Stopping {} tab, closing browser session", tab.label());
            }
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser session: {}", e);
            }

            let result = result?;
            if result.is_empty() {
                info!("No announcements on {} tab for {}", tab.label(), range);
            }
            info!(
                tab = %result.tab(),
                pages = result.pages(),
                rows = result.len(),
                "{} tab complete",
                tab.label()
            );
            Ok(result)
        }
        .instrument(span)
        .await
    }

    async fn crawl(&self, browser: &dyn Browser, tab: &TabScope, range: &DateRange) -> Result<TabResult> {
        let navigator = PageNavigator::new(browser, self.ctx);
        let filter = DateFilterSetter::new(browser, self.ctx);
        let pagination = PaginationController::new(browser, self.ctx);
        let extractor = RowExtractor::new(browser, self.ctx, self.locator);

        navigator.navigate(&self.ctx.site.url).await?;
        if tab.needs_switch() {
            navigator.switch_tab(tab).await?;
        }

        filter.apply(tab, range).await?;
        pagination.scroll_to_bottom().await?;

        let total_pages = pagination.total_pages(tab).await?;
        info!("In progress {} tab, {} pages", tab.label(), total_pages);

        let mut result = TabResult::new(tab.id);
        result.push_page(extractor.extract(tab).await?);

        loop {
            // Re-read every time; the indicator is the only source of truth
            let state = PageState {
                current_page: pagination.current_page(tab).await?,
                total_pages,
            };
            info!(
                page = state.current_page,
                total = state.total_pages,
                rows = result.len(),
                "{} tab page done",
                tab.label()
            );

            if state.is_last() {
                break;
            }

            self.ctx.shutdown.check()?;
            pagination.advance(tab).await?;
            result.push_page(extractor.extract(tab).await?);
        }

        Ok(result)
    }
}
