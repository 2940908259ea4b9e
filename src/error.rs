use std::fmt;
use std::time::Duration;
use thiserror::Error;
use thirtyfour::error::WebDriverError;

/// Errors raised while crawling the announcement listing
#[derive(Debug, Error)]
pub enum CrawlError {
    /// A required element is missing from the page
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// The browser rejected an action or could not reach a page
    #[error("browser error: {0}")]
    Browser(String),

    /// An awaited condition did not resolve before its deadline
    #[error("timed out after {waited:?} waiting for {condition}")]
    Timeout { condition: String, waited: Duration },

    /// The pagination control was clicked but the page indicator did not move by one
    #[error("page did not advance: expected page {expected}, found page {found}")]
    PageNotAdvanced { expected: u32, found: u32 },

    /// Retrieved markup does not have the expected structure
    #[error("parse error: {0}")]
    Parse(String),

    /// A stop was requested while the crawl was running
    #[error("crawl interrupted")]
    Interrupted,

    /// Every crawl attempt failed
    #[error("crawl failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

/// Error categories used for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Navigation,
    Timeout,
    Parsing,
    Exhaustion,
    Interruption,
}

impl CrawlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CrawlError::ElementNotFound(_) | CrawlError::Browser(_) => ErrorKind::Navigation,
            CrawlError::Timeout { .. } | CrawlError::PageNotAdvanced { .. } => ErrorKind::Timeout,
            CrawlError::Parse(_) => ErrorKind::Parsing,
            CrawlError::Exhausted { .. } => ErrorKind::Exhaustion,
            CrawlError::Interrupted => ErrorKind::Interruption,
        }
    }

    pub fn timeout(condition: impl Into<String>, waited: Duration) -> Self {
        CrawlError::Timeout {
            condition: condition.into(),
            waited,
        }
    }
}

impl From<WebDriverError> for CrawlError {
    fn from(err: WebDriverError) -> Self {
        CrawlError::Browser(err.to_string())
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Navigation => "navigation",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Parsing => "parsing",
            ErrorKind::Exhaustion => "exhaustion",
            ErrorKind::Interruption => "interruption",
        };
        f.write_str(name)
    }
}

pub type Result<T> = std::result::Result<T, CrawlError>;
