pub mod csv;

// Re-export common types
pub use self::csv::{write_records, CsvSink};
