//! Log tailing engine for estail
//!
//! This crate provides query building, the dedup window, the poll loop,
//! idle reporting, level statistics and lookup by identifier.

mod lookup;
mod poller;
mod query;
mod reporter;
mod stats;
mod window;

#[cfg(test)]
mod testing;

pub use lookup::{LOOKUP_ATTEMPTS, Lookup, format_lookup, lookup_document};
pub use poller::{CycleOutcome, DocumentSink, Poller, PollerConfig};
pub use query::{CLAUSE_MARGIN_SECS, DEFAULT_LOOKBACK_SECS, LogQuery, initial_watermark, normalize_pattern};
pub use reporter::{DEFAULT_STATS_INTERVAL, IdleReport, ProgressReporter};
pub use stats::LevelStats;
pub use window::{DEFAULT_PAGE_SIZE, DedupWindow};

// Re-export types used in our public API
pub use estail_types::{LevelFilter, LogDocument, Severity};
