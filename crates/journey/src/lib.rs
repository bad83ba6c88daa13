//! Journey construction: date-window filtering of conversions, matching of
//! prior sessions to conversions, and batching for submission.

pub mod batcher;
pub mod builder;
pub mod filter;

pub use batcher::{batches, DEFAULT_BATCH_SIZE};
pub use builder::build_journeys;
pub use filter::DateRange;
