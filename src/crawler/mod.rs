pub mod context;
pub mod controller;
pub mod date_range;
pub mod extractor;
pub mod filter;
pub mod navigator;
pub mod pagination;
pub mod result;
pub mod shutdown;
pub mod tab;
pub mod tab_crawler;

#[cfg(test)]
pub mod testing;

// Re-export common types
pub use context::CrawlContext;
pub use controller::{RetryPolicy, RunOrchestrator};
pub use result::CrawlResult;
pub use shutdown::{shutdown_channel, ShutdownSignal};
pub use tab::{TabId, TabScope};
