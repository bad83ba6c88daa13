use attribution_core::types::Timestamped;
use chrono::NaiveDateTime;
use tracing::info;

/// Inclusive date window. Either bound may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        Self { start, end }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, ts: &NaiveDateTime) -> bool {
        self.start.map_or(true, |start| *ts >= start) && self.end.map_or(true, |end| *ts <= end)
    }

    /// Keep only the records whose timestamp falls inside the window.
    pub fn apply<T: Timestamped>(&self, records: Vec<T>) -> Vec<T> {
        if self.is_unbounded() {
            return records;
        }
        info!(start = ?self.start, end = ?self.end, "Filtering records by date range");
        records
            .into_iter()
            .filter(|r| self.contains(&r.timestamp()))
            .collect()
    }
}
