//! Client for the external credit-scoring service.
//! Batches are submitted one after another; a failed batch is logged and
//! skipped so the rest of the run still produces results.

use std::sync::Arc;

use async_trait::async_trait;
use attribution_core::config::ScoringConfig;
use attribution_core::{AttributionResult, CustomerJourney, JourneyRecord, PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::retry::RetryPolicy;

/// HTTP status the service reports when only part of a batch was scored.
pub const PARTIAL_SUCCESS: u16 = 206;

/// Decoded service reply for one batch.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScoreResponse {
    #[serde(rename = "statusCode", default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub value: Vec<AttributionResult>,
    #[serde(rename = "partialFailureErrors", default)]
    pub partial_failure_errors: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    customer_journeys: &'a [JourneyRecord],
}

/// Seam between the pipeline and whatever computes the credit weights.
#[async_trait]
pub trait ScoringService: Send + Sync {
    /// Score one batch. Any `Err` marks the whole batch as failed.
    async fn compute_ihc(&self, batch: &[CustomerJourney]) -> PipelineResult<ScoreResponse>;
}

#[async_trait]
impl<T: ScoringService + ?Sized> ScoringService for Arc<T> {
    async fn compute_ihc(&self, batch: &[CustomerJourney]) -> PipelineResult<ScoreResponse> {
        (**self).compute_ihc(batch).await
    }
}

/// `reqwest` implementation talking to the hosted attribution API.
pub struct IhcClient {
    http: reqwest::Client,
    endpoint: String,
    conv_type_id: String,
    api_key: String,
}

impl IhcClient {
    pub fn new(config: &ScoringConfig) -> PipelineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| PipelineError::Scoring(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            conv_type_id: config.conv_type_id.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ScoringService for IhcClient {
    async fn compute_ihc(&self, batch: &[CustomerJourney]) -> PipelineResult<ScoreResponse> {
        let records: Vec<JourneyRecord> = batch.iter().map(CustomerJourney::to_record).collect();

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("conv_type_id", self.conv_type_id.as_str())])
            .header("x-api-key", &self.api_key)
            .json(&ScoreRequest {
                customer_journeys: &records,
            })
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| PipelineError::Scoring(e.to_string()))?;

        response
            .json::<ScoreResponse>()
            .await
            .map_err(|e| PipelineError::Scoring(format!("invalid response body: {e}")))
    }
}

/// Flattened results of a full submission run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoringOutcome {
    pub results: Vec<AttributionResult>,
    pub batches_sent: usize,
    pub batches_failed: usize,
}

/// Submits batches through a [`ScoringService`] with failure isolation.
pub struct AttributionClient<S> {
    service: S,
    retry: RetryPolicy,
}

impl<S: ScoringService> AttributionClient<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Submit every batch in order and collect the returned credits.
    /// Result order follows batch order, then the service's order within a batch.
    pub async fn submit_batches<'a, I>(&self, batches: I) -> ScoringOutcome
    where
        I: IntoIterator<Item = &'a [CustomerJourney]>,
    {
        let mut outcome = ScoringOutcome::default();

        for (index, batch) in batches.into_iter().enumerate() {
            outcome.batches_sent += 1;
            metrics::counter!("attribution.batches_sent").increment(1);
            info!(batch = index, journeys = batch.len(), "Sending batch to attribution service");

            match self.submit_with_retry(index, batch).await {
                Ok(response) => {
                    if response.status_code == Some(PARTIAL_SUCCESS) {
                        let errors = response
                            .partial_failure_errors
                            .as_ref()
                            .map(|e| e.to_string())
                            .unwrap_or_default();
                        warn!(batch = index, errors = %errors, "Partial errors occurred");
                    }
                    metrics::counter!("attribution.results_received")
                        .increment(response.value.len() as u64);
                    outcome.results.extend(response.value);
                }
                Err(e) => {
                    outcome.batches_failed += 1;
                    metrics::counter!("attribution.batches_failed").increment(1);
                    error!(batch = index, error = %e, "Attribution request failed, dropping batch");
                }
            }
        }

        info!(
            results = outcome.results.len(),
            batches_sent = outcome.batches_sent,
            batches_failed = outcome.batches_failed,
            "Received results from attribution service"
        );
        outcome
    }

    async fn submit_with_retry(
        &self,
        index: usize,
        batch: &[CustomerJourney],
    ) -> PipelineResult<ScoreResponse> {
        let mut attempt = 0u32;
        loop {
            match self.service.compute_ihc(batch).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.retry.delay_for(attempt);
                    debug!(batch = index, attempt, delay_ms = delay.as_millis() as u64, error = %e, "Retrying batch");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
