//! Channel reporting: aggregation of persisted credit into per-channel,
//! per-day cost and revenue metrics, and CSV export.

pub mod aggregator;
pub mod export;

pub use aggregator::{generate_channel_report, load_channel_report};
pub use export::{export_to_csv, write_csv};
