use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";
const SUMMARY_DATE_FORMAT: &str = "%b %-d, %Y";

/// Date range chosen for a listing.
///
/// The filter is active exactly when at least one bound is set; the fields are
/// private so that cannot drift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateFilterState {
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
}

impl DateFilterState {
    #[must_use]
    pub fn new<Tz: TimeZone>(start: Option<DateTime<Tz>>, end: Option<DateTime<Tz>>) -> Self {
        Self {
            start_date: start.map(|d| d.with_timezone(&Utc)),
            end_date: end.map(|d| d.with_timezone(&Utc)),
        }
    }

    #[must_use]
    pub fn inactive() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_start<Tz: TimeZone>(mut self, start: DateTime<Tz>) -> Self {
        self.start_date = Some(start.with_timezone(&Utc));
        self
    }

    #[must_use]
    pub fn with_end<Tz: TimeZone>(mut self, end: DateTime<Tz>) -> Self {
        self.end_date = Some(end.with_timezone(&Utc));
        self
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }

    #[must_use]
    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end_date
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }

    /// Query bounds as calendar-day strings, `None` when the filter is off.
    #[must_use]
    pub fn day_bounds(&self) -> Option<(Option<String>, Option<String>)> {
        if !self.is_active() {
            return None;
        }
        Some((
            self.start_date.as_ref().map(format_query_date),
            self.end_date.as_ref().map(format_query_date),
        ))
    }
}

/// Formats an instant as `YYYY-MM-DD` of its UTC calendar day.
///
/// The instant is converted to UTC first and then truncated, so a local
/// midnight east of Greenwich lands on the previous day.
#[must_use]
pub fn format_query_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String {
    date.with_timezone(&Utc).format(QUERY_DATE_FORMAT).to_string()
}

/// Short human description of the active range, empty when inactive.
#[must_use]
pub fn date_filter_summary(filter: &DateFilterState) -> String {
    let fmt = |d: &DateTime<Utc>| d.format(SUMMARY_DATE_FORMAT).to_string();
    match (&filter.start_date, &filter.end_date) {
        (Some(start), Some(end)) => format!("{} - {}", fmt(start), fmt(end)),
        (Some(start), None) => format!("From {}", fmt(start)),
        (None, Some(end)) => format!("Until {}", fmt(end)),
        (None, None) => String::new(),
    }
}
