//! Outcome cache for syntaxfix
//!
//! Memoizes the last [`FixOutcome`](syntaxfix_core::FixOutcome) per file,
//! keyed by the file's path and modification time. Any change to the file's
//! modification time turns a lookup into a miss.

pub mod entry;
pub mod outcome;
pub mod stats;

pub use entry::CacheEntry;
pub use outcome::OutcomeCache;
pub use stats::CacheStats;
