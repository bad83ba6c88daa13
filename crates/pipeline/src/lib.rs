//! End-to-end attribution run: load, match, score, validate, persist, report.

pub mod runner;

pub use runner::{Pipeline, RunOptions, RunSummary};
