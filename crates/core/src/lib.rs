//! Shared types, configuration and errors for the channel attribution pipeline.

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{PipelineError, PipelineResult};
pub use types::{
    AttributionResult, ChannelReportRow, Conversion, CustomerJourney, JourneyRecord, Session,
};
