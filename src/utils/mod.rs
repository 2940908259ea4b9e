pub mod identity;
pub mod logging;

// Re-export common functions and types
pub use identity::OperatorIdentity;
pub use logging::{init_logging, default_log_file, LogFormat};
