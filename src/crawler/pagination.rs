use scraper::{Html, Selector};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::browser::Browser;
use crate::crawler::context::{CrawlContext, LogFailure};
use crate::crawler::navigator::PageNavigator;
use crate::crawler::tab::TabScope;
use crate::error::{CrawlError, Result};

/// Position reported by a tab's page indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    pub current_page: u32,
    pub total_pages: u32,
}

impl PageState {
    pub fn is_last(&self) -> bool {
        self.current_page >= self.total_pages
    }
}

/// Read the page indicator of `tab` out of a page snapshot.
///
/// An indicator showing zero pages belongs to an empty listing, which is
/// reported as a single page.
pub fn parse_page_state(html: &str, tab: &TabScope) -> Result<PageState> {
    let document = Html::parse_document(html);
    let current_page = read_number(&document, &tab.current_page_css())?;
    let total_pages = read_number(&document, &tab.total_pages_css())?;

    if total_pages == 0 {
        return Ok(PageState { current_page: 1, total_pages: 1 });
    }

    if current_page == 0 || current_page > total_pages {
        return Err(CrawlError::Parse(format!(
            "page indicator of {} tab reads {} of {}",
            tab.label(),
            current_page,
            total_pages
        )));
    }

    Ok(PageState { current_page, total_pages })
}

fn read_number(document: &Html, css: &str) -> Result<u32> {
    let selector = Selector::parse(css)
        .map_err(|e| CrawlError::Parse(format!("selector {}: {:?}", css, e)))?;

    let element = document
        .select(&selector)
        .next()
        .ok_or_else(|| CrawlError::Parse(format!("no element matches {}", css)))?;

    let text = element.text().collect::<String>();
    text.trim()
        .parse::<u32>()
        .map_err(|_| CrawlError::Parse(format!("{} holds '{}', not a page number", css, text.trim())))
}

/// Reads a tab's page indicator and moves it forward one page at a time
pub struct PaginationController<'a> {
    browser: &'a dyn Browser,
    ctx: &'a CrawlContext,
    navigator: PageNavigator<'a>,
}

impl<'a> PaginationController<'a> {
    pub fn new(browser: &'a dyn Browser, ctx: &'a CrawlContext) -> Self {
        Self {
            browser,
            ctx,
            navigator: PageNavigator::new(browser, ctx),
        }
    }

    pub async fn current_page(&self, tab: &TabScope) -> Result<u32> {
        self.read_state(tab)
            .await
            .map(|state| state.current_page)
            .log_failure(self.ctx, "get_page_current_number")
    }

    pub async fn total_pages(&self, tab: &TabScope) -> Result<u32> {
        self.read_state(tab)
            .await
            .map(|state| state.total_pages)
            .log_failure(self.ctx, "get_total_page")
    }

    async fn read_state(&self, tab: &TabScope) -> Result<PageState> {
        self.navigator
            .wait_present(&tab.indicator_xpath(), self.ctx.waits.overlay_timeout())
            .await?;
        let source = self.browser.page_source().await?;
        parse_page_state(&source, tab)
    }

    /// Scroll until the document stops growing so lazily loaded content is in place
    pub async fn scroll_to_bottom(&self) -> Result<()> {
        self.try_scroll_to_bottom().await.log_failure(self.ctx, "scroll_to_bottom")
    }

    async fn try_scroll_to_bottom(&self) -> Result<()> {
        let waits = &self.ctx.waits;
        let mut last_height = self.browser.scroll_to_bottom().await?;

        for _ in 0..waits.max_scroll_rounds {
            sleep(waits.scroll_pause()).await;
            let height = self.browser.scroll_to_bottom().await?;
            if height == last_height {
                return Ok(());
            }
            last_height = height;
        }

        warn!("Page still growing after {} scroll rounds", waits.max_scroll_rounds);
        Ok(())
    }

    /// Move `tab` to the next page and return the new page number.
    ///
    /// Succeeds only once the indicator reads exactly one more than before the
    /// click. An unchanged indicator re-issues the click up to the advance retry
    /// budget; any other reading is an error.
    pub async fn advance(&self, tab: &TabScope) -> Result<u32> {
        self.try_advance(tab).await.log_failure(self.ctx, "go_to_next_page")
    }

    async fn try_advance(&self, tab: &TabScope) -> Result<u32> {
        let waits = &self.ctx.waits;
        let next_xpath = tab.next_xpath();

        self.try_scroll_to_bottom().await?;
        self.navigator.wait_present(&next_xpath, waits.page_timeout()).await?;

        let previous = self.read_state(tab).await?.current_page;
        let expected = previous + 1;

        for click in 0..=waits.advance_retries {
            self.browser.click(&next_xpath, 0).await?;
            self.navigator.wait_for_loading_cycle(waits.overlay_timeout()).await?;

            match self.wait_for_page_change(tab, previous).await? {
                Some(found) if found == expected => {
                    debug!("{} tab advanced to page {}", tab.label(), found);
                    return Ok(found);
                }
                Some(found) => {
                    return Err(CrawlError::PageNotAdvanced { expected, found });
                }
                None => {
                    warn!(
                        "{} tab still on page {} after click {}",
                        tab.label(),
                        previous,
                        click + 1
                    );
                }
            }
        }

        Err(CrawlError::PageNotAdvanced { expected, found: previous })
    }

    /// Wait for the indicator to leave `previous` and read where it landed.
    /// `None` means it never moved within the page timeout.
    async fn wait_for_page_change(&self, tab: &TabScope, previous: u32) -> Result<Option<u32>> {
        let moved = self
            .browser
            .wait_present(&tab.page_moved_xpath(previous), self.ctx.waits.page_timeout())
            .await?;
        if !moved {
            return Ok(None);
        }

        Ok(Some(self.read_state(tab).await?.current_page))
    }
}
