//! Append-only persistence of attribution results keyed by
//! `(conv_id, session_id)`. Existing rows are never overwritten.

use attribution_core::{AttributionResult, PipelineResult};
use rusqlite::{params, ErrorCode};
use tracing::{debug, info, warn};

use crate::store::Store;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub inserted: usize,
    pub duplicates: usize,
}

impl Store {
    /// Insert every result; rows whose key already exists are skipped.
    pub fn save_results(&mut self, results: &[AttributionResult]) -> PipelineResult<SaveSummary> {
        info!(count = results.len(), "Saving attribution results");
        let mut summary = SaveSummary::default();

        let tx = self.connection_mut().transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO attribution_customer_journey (conv_id, session_id, ihc) VALUES (?1, ?2, ?3)",
            )?;
            for result in results {
                match stmt.execute(params![result.conversion_id, result.session_id, result.ihc_weight]) {
                    Ok(_) => summary.inserted += 1,
                    Err(rusqlite::Error::SqliteFailure(err, _))
                        if err.code == ErrorCode::ConstraintViolation =>
                    {
                        summary.duplicates += 1;
                        debug!(
                            conv_id = %result.conversion_id,
                            session_id = %result.session_id,
                            "Attribution result already stored"
                        );
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        tx.commit()?;

        if summary.duplicates > 0 {
            metrics::counter!("attribution.results_duplicate").increment(summary.duplicates as u64);
            warn!(duplicates = summary.duplicates, "Ignoring duplicate attribution results");
        }
        info!(inserted = summary.inserted, "Attribution results saved");
        Ok(summary)
    }
}
