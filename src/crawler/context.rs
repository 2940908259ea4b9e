use std::panic::Location;
use tracing::error;

use crate::cli::config::{CrawlerConfig, SiteSettings, WaitSettings};
use crate::crawler::shutdown::ShutdownSignal;
use crate::error::{CrawlError, Result};
use crate::utils::OperatorIdentity;

/// Everything a crawl component needs besides the browser itself
#[derive(Debug, Clone)]
pub struct CrawlContext {
    pub site: SiteSettings,
    pub waits: WaitSettings,
    pub operator: OperatorIdentity,
    pub shutdown: ShutdownSignal,
}

impl CrawlContext {
    pub fn new(config: &CrawlerConfig, operator: OperatorIdentity) -> Self {
        Self {
            site: config.site.clone(),
            waits: config.waits.clone(),
            operator,
            shutdown: ShutdownSignal::never(),
        }
    }

    /// Stop the crawl when `shutdown` fires
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }
}

/// Report a failed operation once, at its boundary, and pass the error on.
pub trait LogFailure {
    fn log_failure(self, ctx: &CrawlContext, operation: &str) -> Self;
}

impl<T> LogFailure for Result<T> {
    #[track_caller]
    fn log_failure(self, ctx: &CrawlContext, operation: &str) -> Self {
        if let Err(err) = &self {
            if matches!(err, CrawlError::Interrupted) {
                return self;
            }
            let location = Location::caller();
            error!(
                severity = "CRITICAL",
                client_ip = %ctx.operator.client_ip,
                user = %ctx.operator.user,
                operation,
                kind = %err.kind(),
                file = location.file(),
                line = location.line(),
                "Error {}(): {} at line {}",
                operation,
                err,
                location.line()
            );
        }
        self
    }
}
