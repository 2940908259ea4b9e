pub mod session;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

// Re-export common types
pub use session::WebDriverLauncher;

/// Browser primitives the crawler drives. Elements are addressed by XPath.
///
/// The `wait_*` methods return `Ok(false)` when the timeout passes without the
/// condition holding; errors are reserved for the session itself failing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Browser: Send + Sync {
    /// Load a URL
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Wait until at least one element matches
    async fn wait_present(&self, xpath: &str, timeout: Duration) -> Result<bool>;

    /// Wait until at least one matching element is displayed
    async fn wait_visible(&self, xpath: &str, timeout: Duration) -> Result<bool>;

    /// Wait until no matching element is displayed. Missing elements count as hidden.
    async fn wait_invisible(&self, xpath: &str, timeout: Duration) -> Result<bool>;

    /// Click the `index`-th element matching the path
    async fn click(&self, xpath: &str, index: usize) -> Result<()>;

    /// Clear an input and type `text` into it
    async fn fill(&self, xpath: &str, text: &str) -> Result<()>;

    /// Scroll to the end of the document and report its scroll height
    async fn scroll_to_bottom(&self) -> Result<i64>;

    /// Snapshot of the rendered markup
    async fn page_source(&self) -> Result<String>;

    async fn close(&self) -> Result<()>;
}

/// Opens a fresh browser session; every tab crawl owns the one it gets.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn Browser>>;
}
