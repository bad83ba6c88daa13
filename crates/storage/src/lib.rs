//! SQLite storage: the explicit store handle, readers for the source
//! relations, and append-only persistence of attribution results.

pub mod results;
pub mod sources;
pub mod store;

pub use results::SaveSummary;
pub use store::Store;
