//! Per-channel, per-day aggregation of cost, credit and credit-weighted revenue.
//!
//! Cost and credit are summed per session before the join so a session that
//! shares credit across several conversions contributes its cost once.
//! Every session is reported, whatever conversion window the run used.

use attribution_core::{ChannelReportRow, PipelineResult};
use attribution_storage::Store;
use chrono::NaiveDate;
use tracing::{info, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

const DELETE_ALL: &str = "DELETE FROM channel_reporting";

const INSERT_AGGREGATE: &str = "
    INSERT INTO channel_reporting (channel_name, date, cost, ihc, ihc_revenue)
    SELECT
        ss.channel_name,
        ss.event_date AS date,
        COALESCE(SUM(sc.cost), 0) AS cost,
        COALESCE(SUM(acj.ihc), 0) AS ihc,
        COALESCE(SUM(acj.ihc_revenue), 0) AS ihc_revenue
    FROM session_sources ss
    LEFT JOIN (
        SELECT session_id, SUM(cost) AS cost
        FROM session_costs
        GROUP BY session_id
    ) sc ON ss.session_id = sc.session_id
    LEFT JOIN (
        SELECT a.session_id,
               SUM(a.ihc) AS ihc,
               SUM(a.ihc * COALESCE(c.revenue, 0)) AS ihc_revenue
        FROM attribution_customer_journey a
        LEFT JOIN conversions c ON a.conv_id = c.conv_id
        GROUP BY a.session_id
    ) acj ON ss.session_id = acj.session_id
    GROUP BY ss.channel_name, ss.event_date";

const SELECT_ALL: &str = "
    SELECT channel_name, date, cost, ihc, ihc_revenue
    FROM channel_reporting
    ORDER BY channel_name, date";

/// Rebuild `channel_reporting` from every session and all persisted credit,
/// returning its rows with CPO and ROAS derived. The table is replaced in one
/// transaction, so reruns do not duplicate rows.
pub fn generate_channel_report(store: &mut Store) -> PipelineResult<Vec<ChannelReportRow>> {
    info!("Generating channel reporting metrics");

    let tx = store.connection_mut().transaction()?;
    let replaced = tx.execute(DELETE_ALL, [])?;
    let inserted = tx.execute(INSERT_AGGREGATE, [])?;
    tx.commit()?;
    info!(replaced, inserted, "Channel reporting rows written");

    load_channel_report(store)
}

/// Read persisted report rows, deriving CPO and ROAS.
pub fn load_channel_report(store: &Store) -> PipelineResult<Vec<ChannelReportRow>> {
    let mut stmt = store.connection().prepare(SELECT_ALL)?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, f64>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, f64>(4)?,
        ))
    })?;

    let mut report = Vec::new();
    for row in rows {
        let (channel_name, date, cost, ihc, ihc_revenue) = row?;
        match NaiveDate::parse_from_str(&date, DATE_FORMAT) {
            Ok(date) => report.push(ChannelReportRow::derive(channel_name, date, cost, ihc, ihc_revenue)),
            Err(e) => warn!(channel = %channel_name, date = %date, error = %e, "Skipping report row with bad date"),
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use attribution_core::AttributionResult;

    fn seeded_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store
            .connection()
            .execute_batch(
                "CREATE TABLE conversions (conv_id TEXT, user_id TEXT, conv_date TEXT, conv_time TEXT, revenue REAL);
                 CREATE TABLE session_sources (session_id TEXT, user_id TEXT, event_date TEXT, event_time TEXT,
                     channel_name TEXT, holder_engagement INTEGER, closer_engagement INTEGER, impression_interaction INTEGER);
                 CREATE TABLE session_costs (session_id TEXT, cost REAL);
                 INSERT INTO conversions VALUES ('c1', 'u1', '2023-09-05', '12:00:00', 100.0);
                 INSERT INTO conversions VALUES ('c2', 'u1', '2023-09-06', '12:00:00', 50.0);
                 INSERT INTO session_sources VALUES ('s1', 'u1', '2023-09-01', '08:00:00', 'search', 1, 0, 0);
                 INSERT INTO session_sources VALUES ('s2', 'u1', '2023-09-04', '09:00:00', 'social', 0, 1, 0);
                 INSERT INTO session_sources VALUES ('s3', 'u2', '2023-09-04', '10:00:00', 'display', 0, 0, 1);
                 INSERT INTO session_costs VALUES ('s1', 10.0);
                 INSERT INTO session_costs VALUES ('s2', 4.0);",
            )
            .unwrap();
        store.ensure_output_schema().unwrap();
        store
    }

    fn credit(conv: &str, session: &str, ihc: f64) -> AttributionResult {
        AttributionResult {
            conversion_id: conv.to_string(),
            session_id: session.to_string(),
            ihc_weight: ihc,
        }
    }

    fn row<'a>(report: &'a [ChannelReportRow], channel: &str) -> &'a ChannelReportRow {
        report.iter().find(|r| r.channel_name == channel).unwrap()
    }

    #[test]
    fn test_revenue_split_by_channel() {
        let mut store = seeded_store();
        store
            .save_results(&[credit("c1", "s1", 0.2), credit("c1", "s2", 0.8)])
            .unwrap();

        let report = generate_channel_report(&mut store).unwrap();
        assert_eq!(report.len(), 3);

        let search = row(&report, "search");
        assert!((search.ihc_revenue - 20.0).abs() < 1e-9);
        assert!((search.cpo - 50.0).abs() < 1e-9);
        assert!((search.roas - 2.0).abs() < 1e-9);

        let social = row(&report, "social");
        assert!((social.ihc_revenue - 80.0).abs() < 1e-9);
        assert!((social.cost - 4.0).abs() < 1e-9);

        let display = row(&report, "display");
        assert_eq!(display.cost, 0.0);
        assert_eq!(display.ihc, 0.0);
        assert_eq!(display.cpo, 0.0);
        assert_eq!(display.roas, 0.0);
    }

    #[test]
    fn test_cost_counted_once_for_multi_conversion_session() {
        let mut store = seeded_store();
        store
            .save_results(&[credit("c1", "s1", 1.0), credit("c2", "s1", 0.5)])
            .unwrap();

        let report = generate_channel_report(&mut store).unwrap();
        let search = row(&report, "search");
        assert!((search.cost - 10.0).abs() < 1e-9);
        assert!((search.ihc - 1.5).abs() < 1e-9);
        assert!((search.ihc_revenue - 125.0).abs() < 1e-9);
    }

    #[test]
    fn test_rerun_replaces_previous_rows() {
        let mut store = seeded_store();

        generate_channel_report(&mut store).unwrap();
        let second = generate_channel_report(&mut store).unwrap();
        assert_eq!(second.len(), 3);

        let total: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM channel_reporting", [], |r| r.get(0))
            .unwrap();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_credit_saved_between_runs_replaces_stale_rows() {
        let mut store = seeded_store();
        let before = generate_channel_report(&mut store).unwrap();
        assert_eq!(row(&before, "search").ihc, 0.0);

        store.save_results(&[credit("c1", "s1", 1.0)]).unwrap();
        let after = generate_channel_report(&mut store).unwrap();

        assert_eq!(after.len(), 3);
        assert!((row(&after, "search").ihc - 1.0).abs() < 1e-9);
        assert!((row(&after, "search").ihc_revenue - 100.0).abs() < 1e-9);
    }
}
