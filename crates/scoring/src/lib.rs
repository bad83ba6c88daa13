//! Attribution scoring: submission of journey batches to the external
//! credit-scoring service and validation of the returned weights.

pub mod client;
pub mod retry;
pub mod validator;

pub use client::{AttributionClient, IhcClient, ScoreResponse, ScoringOutcome, ScoringService};
pub use retry::RetryPolicy;
pub use validator::{enforce, validate, ValidationReport};
