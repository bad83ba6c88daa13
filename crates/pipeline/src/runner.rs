use attribution_core::config::{AppConfig, ValidationPolicy};
use attribution_core::{ChannelReportRow, PipelineResult};
use attribution_journey::{batches, build_journeys, DateRange, DEFAULT_BATCH_SIZE};
use attribution_reporting::generate_channel_report;
use attribution_scoring::{enforce, validate, AttributionClient, RetryPolicy, ScoringService};
use attribution_storage::{SaveSummary, Store};
use tracing::info;

/// Per-run knobs, usually derived from [`AppConfig`].
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub range: DateRange,
    pub batch_size: usize,
    pub validation_policy: ValidationPolicy,
    pub tolerance: f64,
}

impl RunOptions {
    pub fn from_config(config: &AppConfig, range: DateRange) -> Self {
        Self {
            range,
            batch_size: config.scoring.batch_size,
            validation_policy: config.validation.policy,
            tolerance: config.validation.tolerance,
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            range: DateRange::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            validation_policy: ValidationPolicy::LogOnly,
            tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub conversions: usize,
    pub journeys: usize,
    pub batches_sent: usize,
    pub batches_failed: usize,
    pub results: usize,
    pub invalid_conversions: usize,
    pub saved: SaveSummary,
    pub report: Vec<ChannelReportRow>,
}

pub struct Pipeline<S> {
    client: AttributionClient<S>,
    options: RunOptions,
}

impl<S: ScoringService> Pipeline<S> {
    pub fn new(service: S, options: RunOptions) -> Self {
        Self {
            client: AttributionClient::new(service),
            options,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.client = self.client.with_retry(retry);
        self
    }

    /// Run every stage against `store`. Only store failures and a rejected
    /// validation under [`ValidationPolicy::FailFast`] abort the run.
    pub async fn run(&self, store: &mut Store) -> PipelineResult<RunSummary> {
        info!("Starting attribution run");
        store.ensure_output_schema()?;

        let conversions = self.options.range.apply(store.load_conversions()?);
        let sessions = store.load_sessions()?;

        let journeys = build_journeys(&conversions, &sessions);

        let outcome = self
            .client
            .submit_batches(batches(&journeys, self.options.batch_size))
            .await;

        let validation = validate(&outcome.results, self.options.tolerance);
        enforce(&validation, self.options.validation_policy)?;

        let saved = store.save_results(&outcome.results)?;
        let report = generate_channel_report(store)?;

        info!(
            conversions = conversions.len(),
            journeys = journeys.len(),
            results = outcome.results.len(),
            report_rows = report.len(),
            "Attribution run completed"
        );

        Ok(RunSummary {
            conversions: conversions.len(),
            journeys: journeys.len(),
            batches_sent: outcome.batches_sent,
            batches_failed: outcome.batches_failed,
            results: outcome.results.len(),
            invalid_conversions: validation.invalid.len(),
            saved,
            report,
        })
    }
}
