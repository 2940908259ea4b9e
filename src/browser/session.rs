use async_trait::async_trait;
use thirtyfour::prelude::*;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::browser::{Browser, BrowserLauncher};
use crate::cli::config::BrowserSettings;
use crate::error::{CrawlError, Result};

/// WebDriver-backed browser session
pub struct BrowserSession {
    /// WebDriver instance, taken on close
    driver: Mutex<Option<WebDriver>>,
    /// Re-check interval for element waits
    poll_interval: Duration,
}

impl BrowserSession {
    /// Connect to the WebDriver endpoint and open a new session
    pub async fn start(settings: &BrowserSettings, poll_interval: Duration) -> Result<Self> {
        let driver = match settings.browser_type.as_str() {
            "chrome" => {
                let mut caps = DesiredCapabilities::chrome();
                if settings.headless {
                    caps.set_headless()?;
                }
                caps.add_chrome_arg("--disable-dev-shm-usage")?;
                WebDriver::new(&settings.webdriver_url, caps).await?
            }
            "firefox" => {
                let mut caps = DesiredCapabilities::firefox();
                if settings.headless {
                    caps.set_headless()?;
                }
                WebDriver::new(&settings.webdriver_url, caps).await?
            }
            other => {
                return Err(CrawlError::Browser(format!("unsupported browser type: {}", other)));
            }
        };

        driver
            .set_page_load_timeout(Duration::from_secs(settings.page_load_timeout_secs))
            .await?;

        debug!("Browser session started against {}", settings.webdriver_url);

        Ok(Self {
            driver: Mutex::new(Some(driver)),
            poll_interval,
        })
    }

    fn not_initialized() -> CrawlError {
        CrawlError::Browser("Browser session not initialized".to_string())
    }
}

#[async_trait]
impl Browser for BrowserSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        let guard = self.driver.lock().await;
        let driver = guard.as_ref().ok_or_else(Self::not_initialized)?;

        debug!("Navigating to: {}", url);
        driver.goto(url).await
            .map_err(|e| CrawlError::Browser(format!("Failed to navigate to URL {}: {}", url, e)))?;

        Ok(())
    }

    async fn wait_present(&self, xpath: &str, timeout: Duration) -> Result<bool> {
        let guard = self.driver.lock().await;
        let driver = guard.as_ref().ok_or_else(Self::not_initialized)?;

        let found = driver
            .query(By::XPath(xpath))
            .wait(timeout, self.poll_interval)
            .exists()
            .await?;
        Ok(found)
    }

    async fn wait_visible(&self, xpath: &str, timeout: Duration) -> Result<bool> {
        let guard = self.driver.lock().await;
        let driver = guard.as_ref().ok_or_else(Self::not_initialized)?;

        let shown = driver
            .query(By::XPath(xpath))
            .and_displayed()
            .wait(timeout, self.poll_interval)
            .exists()
            .await?;
        Ok(shown)
    }

    async fn wait_invisible(&self, xpath: &str, timeout: Duration) -> Result<bool> {
        let guard = self.driver.lock().await;
        let driver = guard.as_ref().ok_or_else(Self::not_initialized)?;

        let hidden = driver
            .query(By::XPath(xpath))
            .and_displayed()
            .wait(timeout, self.poll_interval)
            .not_exists()
            .await?;
        Ok(hidden)
    }

    async fn click(&self, xpath: &str, index: usize) -> Result<()> {
        let guard = self.driver.lock().await;
        let driver = guard.as_ref().ok_or_else(Self::not_initialized)?;

        let elements = driver.find_all(By::XPath(xpath)).await?;
        let element = elements
            .get(index)
            .ok_or_else(|| CrawlError::ElementNotFound(format!("{} (index {})", xpath, index)))?;

        element.click().await?;
        debug!("Clicked {} (index {})", xpath, index);

        Ok(())
    }

    async fn fill(&self, xpath: &str, text: &str) -> Result<()> {
        let guard = self.driver.lock().await;
        let driver = guard.as_ref().ok_or_else(Self::not_initialized)?;

        let elements = driver.find_all(By::XPath(xpath)).await?;
        let element = elements
            .first()
            .ok_or_else(|| CrawlError::ElementNotFound(xpath.to_string()))?;

        element.clear().await?;
        element.send_keys(text).await?;
        debug!("Typed '{}' into {}", text, xpath);

        Ok(())
    }

    async fn scroll_to_bottom(&self) -> Result<i64> {
        let guard = self.driver.lock().await;
        let driver = guard.as_ref().ok_or_else(Self::not_initialized)?;

        let ret = driver
            .execute(
                "window.scrollTo(0, document.body.scrollHeight); return document.body.scrollHeight;",
                Vec::new(),
            )
            .await?;

        ret.json()
            .as_i64()
            .ok_or_else(|| CrawlError::Browser("scroll height is not a number".to_string()))
    }

    async fn page_source(&self) -> Result<String> {
        let guard = self.driver.lock().await;
        let driver = guard.as_ref().ok_or_else(Self::not_initialized)?;

        let source = driver.source().await?;
        Ok(source)
    }

    async fn close(&self) -> Result<()> {
        if let Some(driver) = self.driver.lock().await.take() {
            driver.quit().await?;
            debug!("Browser session closed");
        }

        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.get_mut().take() {
            // Only reachable when a crawl was dropped before it could close the session
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = driver.quit().await {
                        error!("Error closing browser session during drop: {}", e);
                    }
                });
            }
        }
    }
}

/// Launches WebDriver sessions from the configured endpoint
pub struct WebDriverLauncher {
    settings: BrowserSettings,
    poll_interval: Duration,
}

impl WebDriverLauncher {
    pub fn new(settings: BrowserSettings, poll_interval: Duration) -> Self {
        Self { settings, poll_interval }
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn Browser>> {
        let session = BrowserSession::start(&self.settings, self.poll_interval).await?;
        Ok(Box::new(session))
    }
}
