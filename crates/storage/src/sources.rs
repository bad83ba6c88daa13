//! Readers for the externally owned `conversions` and `session_sources` tables.

use attribution_core::types::parse_timestamp;
use attribution_core::{Conversion, PipelineResult, Session};
use chrono::NaiveDateTime;
use rusqlite::types::ValueRef;
use rusqlite::Row;
use tracing::{info, warn};

use crate::store::Store;

/// Read an identifier column that may be stored as text or integer.
/// NULL and empty ids come back as `None`.
fn id_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    let id = match row.get_ref(idx)? {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Null => return Ok(None),
    };
    Ok(Some(id).filter(|id| !id.trim().is_empty()))
}

/// Parse a date and time pair; either side may be NULL.
fn timestamp_columns(date: Option<&str>, time: Option<&str>) -> Option<NaiveDateTime> {
    parse_timestamp(date?, time?)
}

impl Store {
    pub fn load_conversions(&self) -> PipelineResult<Vec<Conversion>> {
        info!("Loading conversions");
        let mut stmt = self.connection().prepare(
            "SELECT conv_id, user_id, conv_date, conv_time, revenue FROM conversions",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                id_column(row, 0)?,
                id_column(row, 1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
            ))
        })?;

        let mut conversions = Vec::new();
        for row in rows {
            let (conversion_id, user_id, date, time, revenue) = row?;
            let (Some(conversion_id), Some(user_id)) = (conversion_id, user_id) else {
                warn!("Skipping conversion with missing conv_id or user_id");
                continue;
            };
            match timestamp_columns(date.as_deref(), time.as_deref()) {
                Some(conv_timestamp) => conversions.push(Conversion {
                    conversion_id,
                    user_id,
                    conv_timestamp,
                    revenue,
                }),
                None => warn!(conv_id = %conversion_id, date = ?date, time = ?time, "Skipping conversion with unparsable timestamp"),
            }
        }

        info!(count = conversions.len(), "Conversions loaded");
        Ok(conversions)
    }

    pub fn load_sessions(&self) -> PipelineResult<Vec<Session>> {
        info!("Loading sessions");
        let mut stmt = self.connection().prepare(
            "SELECT session_id, user_id, event_date, event_time, channel_name,
                    holder_engagement, closer_engagement, impression_interaction
             FROM session_sources",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                id_column(row, 0)?,
                id_column(row, 1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                row.get::<_, Option<i64>>(5)?.unwrap_or(0),
                row.get::<_, Option<i64>>(6)?.unwrap_or(0),
                row.get::<_, Option<i64>>(7)?.unwrap_or(0),
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (session_id, user_id, date, time, channel_name, holder, closer, impression) = row?;
            let (Some(session_id), Some(user_id)) = (session_id, user_id) else {
                warn!("Skipping session with missing session_id or user_id");
                continue;
            };
            match timestamp_columns(date.as_deref(), time.as_deref()) {
                Some(event_timestamp) => sessions.push(Session {
                    session_id,
                    user_id,
                    event_timestamp,
                    channel_name,
                    holder_engagement: holder,
                    closer_engagement: closer,
                    impression_interaction: impression,
                }),
                None => warn!(session_id = %session_id, date = ?date, time = ?time, "Skipping session with unparsable timestamp"),
            }
        }

        info!(count = sessions.len(), "Sessions loaded");
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store
            .connection()
            .execute_batch(
                "CREATE TABLE conversions (conv_id TEXT, user_id TEXT, conv_date TEXT, conv_time TEXT, revenue REAL);
                 CREATE TABLE session_sources (session_id TEXT, user_id TEXT, event_date TEXT, event_time TEXT,
                     channel_name TEXT, holder_engagement INTEGER, closer_engagement INTEGER, impression_interaction INTEGER);
                 INSERT INTO conversions VALUES ('c1', 'u1', '2023-09-05', '12:00:00', 100.0);
                 INSERT INTO conversions VALUES ('c2', 'u2', 'bad-date', '12:00:00', 50.0);
                 INSERT INTO session_sources VALUES ('s1', 'u1', '2023-09-01', '08:00:00', 'search', 1, 0, 0);
                 INSERT INTO session_sources VALUES (42, 'u1', '2023-09-04', '09:00:00', 'social', 0, 1, NULL);",
            )
            .unwrap();
        store
    }

    #[test]
    fn test_load_conversions_skips_bad_timestamps() {
        let conversions = seeded_store().load_conversions().unwrap();
        assert_eq!(conversions.len(), 1);
        assert_eq!(conversions[0].conversion_id, "c1");
        assert_eq!(
            conversions[0].conv_timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            "2023-09-05 12:00:00"
        );
        assert_eq!(conversions[0].revenue, 100.0);
    }

    #[test]
    fn test_load_sessions_reads_integer_ids_and_nulls() {
        let sessions = seeded_store().load_sessions().unwrap();
        assert_eq!(sessions.len(), 2);
        let social = sessions.iter().find(|s| s.channel_name == "social").unwrap();
        assert_eq!(social.session_id, "42");
        assert_eq!(social.closer_engagement, 1);
        assert_eq!(social.impression_interaction, 0);
    }

    #[test]
    fn test_null_date_or_time_rows_are_skipped() {
        let store = seeded_store();
        store
            .connection()
            .execute_batch(
                "INSERT INTO session_sources VALUES ('s-null-date', 'u1', NULL, '08:00:00', 'email', 0, 0, 0);
                 INSERT INTO session_sources VALUES ('s-null-time', 'u1', '2023-09-02', NULL, 'email', 0, 0, 0);
                 INSERT INTO conversions VALUES ('c-null', 'u1', NULL, NULL, 10.0);",
            )
            .unwrap();

        let sessions = store.load_sessions().unwrap();
        assert_eq!(sessions.len(), 2);
        assert!(sessions.iter().all(|s| !s.session_id.starts_with("s-null")));

        let conversions = store.load_conversions().unwrap();
        assert_eq!(conversions.len(), 1);
        assert_eq!(conversions[0].conversion_id, "c1");
    }

    #[test]
    fn test_null_ids_are_skipped() {
        let store = seeded_store();
        store
            .connection()
            .execute_batch(
                "INSERT INTO conversions VALUES ('c-anon', NULL, '2023-09-05', '12:00:00', 10.0);
                 INSERT INTO conversions VALUES (NULL, 'u1', '2023-09-05', '12:00:00', 10.0);
                 INSERT INTO session_sources VALUES ('s-anon', NULL, '2023-09-01', '08:00:00', 'email', 0, 0, 0);
                 INSERT INTO session_sources VALUES ('', 'u1', '2023-09-01', '08:00:00', 'email', 0, 0, 0);",
            )
            .unwrap();

        let conversions = store.load_conversions().unwrap();
        assert_eq!(conversions.len(), 1);
        assert!(conversions.iter().all(|c| !c.user_id.is_empty()));

        let sessions = store.load_sessions().unwrap();
        assert_eq!(sessions.len(), 2);
        assert!(sessions.iter().all(|s| s.session_id != "s-anon" && !s.session_id.is_empty()));
    }

    #[test]
    fn test_missing_source_table_is_an_error() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.load_conversions().is_err());
    }
}
