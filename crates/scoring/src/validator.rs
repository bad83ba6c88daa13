//! Credit-sum validation. The weights returned for one conversion should add
//! up to one; conversions that never received a result are not checked.

use std::collections::BTreeMap;

use attribution_core::config::ValidationPolicy;
use attribution_core::{AttributionResult, PipelineError, PipelineResult};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Number of distinct conversions checked.
    pub checked: usize,
    /// Conversions whose credit sum is off, with the sum observed.
    pub invalid: BTreeMap<String, f64>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.invalid.is_empty()
    }
}

pub fn validate(results: &[AttributionResult], tolerance: f64) -> ValidationReport {
    let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
    for result in results {
        *sums.entry(result.conversion_id.as_str()).or_insert(0.0) += result.ihc_weight;
    }

    let invalid = sums
        .iter()
        .filter(|(_, total)| (**total - 1.0).abs() > tolerance)
        .map(|(id, total)| ((*id).to_string(), *total))
        .collect();

    ValidationReport {
        checked: sums.len(),
        invalid,
    }
}

/// Log the report and apply the configured policy.
pub fn enforce(report: &ValidationReport, policy: ValidationPolicy) -> PipelineResult<()> {
    if report.is_valid() {
        info!(checked = report.checked, "Data validation passed: all credit sums equal 1");
        return Ok(());
    }

    warn!(
        checked = report.checked,
        invalid = report.invalid.len(),
        conversions = ?report.invalid,
        "Data validation failed: credit sums differ from 1"
    );

    match policy {
        ValidationPolicy::LogOnly => Ok(()),
        ValidationPolicy::FailFast => Err(PipelineError::Validation {
            count: report.invalid.len(),
        }),
    }
}
