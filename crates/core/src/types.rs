use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Timestamp layout used by the source tables and the attribution service.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Combine a `YYYY-MM-DD` date column and an `HH:MM:SS` time column.
pub fn parse_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    let joined = format!("{} {}", date.trim(), time.trim());
    NaiveDateTime::parse_from_str(&joined, TIMESTAMP_FORMAT).ok()
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Records that carry the timestamp a date window is applied to.
pub trait Timestamped {
    fn timestamp(&self) -> NaiveDateTime;
}

/// A conversion read from the `conversions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub conversion_id: String,
    pub user_id: String,
    pub conv_timestamp: NaiveDateTime,
    pub revenue: f64,
}

impl Timestamped for Conversion {
    fn timestamp(&self) -> NaiveDateTime {
        self.conv_timestamp
    }
}

/// A marketing session read from the `session_sources` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub event_timestamp: NaiveDateTime,
    pub channel_name: String,
    pub holder_engagement: i64,
    pub closer_engagement: i64,
    pub impression_interaction: i64,
}

impl Timestamped for Session {
    fn timestamp(&self) -> NaiveDateTime {
        self.event_timestamp
    }
}

/// A (conversion, session) pairing that is a candidate for credit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerJourney {
    pub conversion_id: String,
    pub session_id: String,
    pub timestamp: NaiveDateTime,
    pub channel_label: String,
    pub holder_engagement: i64,
    pub closer_engagement: i64,
    pub impression_interaction: i64,
    pub is_last_touch: bool,
}

impl CustomerJourney {
    /// Wire representation expected by the attribution service.
    pub fn to_record(&self) -> JourneyRecord {
        JourneyRecord {
            conversion_id: self.conversion_id.clone(),
            session_id: self.session_id.clone(),
            timestamp: format_timestamp(&self.timestamp),
            channel_label: self.channel_label.clone(),
            holder_engagement: self.holder_engagement,
            closer_engagement: self.closer_engagement,
            conversion: u8::from(self.is_last_touch),
            impression_interaction: self.impression_interaction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyRecord {
    pub conversion_id: String,
    pub session_id: String,
    pub timestamp: String,
    pub channel_label: String,
    pub holder_engagement: i64,
    pub closer_engagement: i64,
    pub conversion: u8,
    pub impression_interaction: i64,
}

/// Credit assigned to one session for one conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionResult {
    pub conversion_id: String,
    pub session_id: String,
    #[serde(rename = "ihc")]
    pub ihc_weight: f64,
}

/// One row of the per-channel, per-day report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelReportRow {
    pub channel_name: String,
    pub date: NaiveDate,
    pub cost: f64,
    pub ihc: f64,
    pub ihc_revenue: f64,
    #[serde(rename = "CPO")]
    pub cpo: f64,
    #[serde(rename = "ROAS")]
    pub roas: f64,
}

impl ChannelReportRow {
    /// Build a row from aggregated sums. CPO and ROAS are zero when their
    /// denominator is zero.
    pub fn derive(
        channel_name: impl Into<String>,
        date: NaiveDate,
        cost: f64,
        ihc: f64,
        ihc_revenue: f64,
    ) -> Self {
        Self {
            channel_name: channel_name.into(),
            date,
            cost,
            ihc,
            ihc_revenue,
            cpo: safe_ratio(cost, ihc),
            roas: safe_ratio(ihc_revenue, cost),
        }
    }
}

fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}
