use tracing::debug;

use crate::browser::Browser;
use crate::crawler::context::{CrawlContext, LogFailure};
use crate::crawler::date_range::DateRange;
use crate::crawler::navigator::PageNavigator;
use crate::crawler::tab::TabScope;
use crate::error::Result;

/// Fills a tab's date inputs and runs the search
pub struct DateFilterSetter<'a> {
    browser: &'a dyn Browser,
    ctx: &'a CrawlContext,
    navigator: PageNavigator<'a>,
}

impl<'a> DateFilterSetter<'a> {
    pub fn new(browser: &'a dyn Browser, ctx: &'a CrawlContext) -> Self {
        Self {
            browser,
            ctx,
            navigator: PageNavigator::new(browser, ctx),
        }
    }

    /// Restrict the tab's listing to `range` and wait for the results to load
    pub async fn apply(&self, tab: &TabScope, range: &DateRange) -> Result<()> {
        self.try_apply(tab, range).await.log_failure(self.ctx, "set_page_date_range")
    }

    async fn try_apply(&self, tab: &TabScope, range: &DateRange) -> Result<()> {
        let site = &self.ctx.site;
        let waits = &self.ctx.waits;

        self.navigator
            .wait_present(&site.results_table_xpath, waits.overlay_timeout())
            .await?;

        self.browser.fill(&tab.settings.start_date_xpath, &range.start_param()).await?;
        self.browser.fill(&tab.settings.end_date_xpath, &range.end_param()).await?;

        // Both tabs' search buttons share one path; the tab picks its own
        self.browser.click(&site.confirm_xpath, tab.settings.confirm_index).await?;

        self.navigator.wait_for_overlay_cycle(waits.filter_timeout()).await?;

        debug!("Date filter {} applied on {} tab", range, tab.label());
        Ok(())
    }
}
