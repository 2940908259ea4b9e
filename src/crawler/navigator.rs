use std::time::Duration;
use tracing::debug;

use crate::browser::Browser;
use crate::crawler::context::{CrawlContext, LogFailure};
use crate::crawler::tab::TabScope;
use crate::error::{CrawlError, Result};

/// Navigation and synchronisation primitives shared by the crawl components
#[derive(Clone, Copy)]
pub struct PageNavigator<'a> {
    browser: &'a dyn Browser,
    ctx: &'a CrawlContext,
}

impl<'a> PageNavigator<'a> {
    pub fn new(browser: &'a dyn Browser, ctx: &'a CrawlContext) -> Self {
        Self { browser, ctx }
    }

    /// Load a URL
    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.browser.navigate(url).await.log_failure(self.ctx, "visit_site")
    }

    /// Activate a tab that is not shown by default
    pub async fn switch_tab(&self, tab: &TabScope) -> Result<()> {
        self.try_switch_tab(tab).await.log_failure(self.ctx, "change_tab")
    }

    async fn try_switch_tab(&self, tab: &TabScope) -> Result<()> {
        let Some(switch_xpath) = tab.settings.switch_xpath.as_deref() else {
            return Ok(());
        };

        let timeout = self.ctx.waits.overlay_timeout();
        self.wait_invisible(&self.ctx.site.overlay_xpath, timeout).await?;
        self.browser.click(switch_xpath, 0).await?;
        self.wait_for_overlay_cycle(timeout).await?;

        debug!("Switched to {} tab", tab.label());
        Ok(())
    }

    /// Wait for the loading overlay to come and go
    pub async fn wait_for_overlay_cycle(&self, timeout: Duration) -> Result<()> {
        self.wait_for_cycle(&self.ctx.site.overlay_xpath, timeout).await
    }

    /// Wait for the results container to enter and leave its loading state
    pub async fn wait_for_loading_cycle(&self, timeout: Duration) -> Result<()> {
        self.wait_for_cycle(&self.ctx.site.loading_xpath, timeout).await
    }

    /// An indicator can appear and vanish between two polls, so its appearance
    /// is only looked for during the grace period. Its disappearance is required.
    async fn wait_for_cycle(&self, xpath: &str, timeout: Duration) -> Result<()> {
        let grace = self.ctx.waits.appear_grace().min(timeout);
        if !self.browser.wait_visible(xpath, grace).await? {
            debug!("{} did not appear within {:?}, assuming it already cleared", xpath, grace);
        }

        self.wait_invisible(xpath, timeout).await
    }

    pub async fn wait_present(&self, xpath: &str, timeout: Duration) -> Result<()> {
        let found = self.browser.wait_present(xpath, timeout).await?;
        expect(found, || format!("{} to be present", xpath), timeout)
    }

    pub async fn wait_invisible(&self, xpath: &str, timeout: Duration) -> Result<()> {
        let hidden = self.browser.wait_invisible(xpath, timeout).await?;
        expect(hidden, || format!("{} to disappear", xpath), timeout)
    }
}

fn expect(held: bool, condition: impl FnOnce() -> String, waited: Duration) -> Result<()> {
    if held {
        Ok(())
    } else {
        Err(CrawlError::timeout(condition(), waited))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::MockBrowser;
    use crate::cli::config::CrawlerConfig;
    use crate::crawler::tab::TabId;
    use crate::utils::OperatorIdentity;
    use mockall::Sequence;

    fn test_context() -> CrawlContext {
        let mut config = CrawlerConfig::default();
        config.waits.poll_interval_ms = 1;
        config.waits.appear_grace_ms = 20;
        config.waits.overlay_timeout_secs = 1;
        CrawlContext::new(&config, OperatorIdentity::new("127.0.0.1", "tester"))
    }

    #[tokio::test]
    async fn test_overlay_cycle_waits_for_disappearance() {
        let ctx = test_context();
        let mut browser = MockBrowser::new();
        let mut seq = Sequence::new();
        browser
            .expect_wait_visible()
            .withf(|xpath, timeout| xpath.contains("c-loading-overlay") && *timeout == Duration::from_millis(20))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(true));
        browser
            .expect_wait_invisible()
            .withf(|xpath, timeout| xpath.contains("c-loading-overlay") && *timeout == Duration::from_secs(1))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(true));

        let navigator = PageNavigator::new(&browser, &ctx);
        assert!(navigator.wait_for_overlay_cycle(Duration::from_secs(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_missed_overlay_is_not_fatal() {
        let ctx = test_context();
        let mut browser = MockBrowser::new();
        browser.expect_wait_visible().times(1).returning(|_, _| Ok(false));
        browser.expect_wait_invisible().times(1).returning(|_, _| Ok(true));

        let navigator = PageNavigator::new(&browser, &ctx);
        assert!(navigator.wait_for_overlay_cycle(Duration::from_secs(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_stuck_overlay_times_out() {
        let ctx = test_context();
        let mut browser = MockBrowser::new();
        browser.expect_wait_visible().returning(|_, _| Ok(true));
        browser.expect_wait_invisible().returning(|_, _| Ok(false));

        let navigator = PageNavigator::new(&browser, &ctx);
        let err = navigator
            .wait_for_overlay_cycle(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::Timeout { waited, .. } if waited == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_grace_never_exceeds_timeout() {
        let ctx = test_context();
        let mut browser = MockBrowser::new();
        browser
            .expect_wait_visible()
            .withf(|_, timeout| *timeout == Duration::from_millis(5))
            .times(1)
            .returning(|_, _| Ok(false));
        browser.expect_wait_invisible().returning(|_, _| Ok(true));

        let navigator = PageNavigator::new(&browser, &ctx);
        assert!(navigator.wait_for_loading_cycle(Duration::from_millis(5)).await.is_ok());
    }

    #[tokio::test]
    async fn test_session_error_is_not_a_timeout() {
        let ctx = test_context();
        let mut browser = MockBrowser::new();
        browser
            .expect_wait_present()
            .returning(|_, _| Err(CrawlError::Browser("session deleted".into())));

        let navigator = PageNavigator::new(&browser, &ctx);
        let err = navigator
            .wait_present("//table", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::Browser(_)));
    }

    #[tokio::test]
    async fn test_switch_tab_clicks_switch_control() {
        let ctx = test_context();
        let tab = TabScope::new(TabId::Second, &ctx.site);
        let mut browser = MockBrowser::new();
        browser.expect_wait_invisible().returning(|_, _| Ok(true));
        browser.expect_wait_visible().returning(|_, _| Ok(true));
        browser
            .expect_click()
            .withf(|xpath, index| xpath.contains("ChiNext") && *index == 0)
            .times(1)
            .returning(|_, _| Ok(()));

        let navigator = PageNavigator::new(&browser, &ctx);
        assert!(navigator.switch_tab(&tab).await.is_ok());
    }

    #[tokio::test]
    async fn test_navigate_failure_propagates() {
        let ctx = test_context();
        let mut browser = MockBrowser::new();
        browser
            .expect_navigate()
            .returning(|_| Err(CrawlError::Browser("connection refused".into())));

        let navigator = PageNavigator::new(&browser, &ctx);
        let err = navigator.navigate("https://example.com").await.unwrap_err();
        assert!(matches!(err, CrawlError::Browser(_)));
    }
}
