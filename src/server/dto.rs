use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::access::AccessScope;
use crate::listing::RecordPage;
use crate::photos::{PhotoFailure, PhotoUploadReport};
use crate::query::{DateFilterState, date_filter_summary};
use crate::types::{CurrentUser, IncidentPhoto, Session};

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub token: String,
    pub session: Session,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: CurrentUser,
    pub business_unit: Option<String>,
    pub can_see_all_data: bool,
    pub scope: AccessScope,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListRecordsParams {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl ListRecordsParams {
    #[must_use]
    pub fn date_filter(&self) -> DateFilterState {
        DateFilterState::new(
            self.start_date.map(midnight_utc),
            self.end_date.map(midnight_utc),
        )
    }
}

fn midnight_utc(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(chrono::NaiveTime::MIN).and_utc()
}

#[derive(Debug, Serialize)]
pub struct RecordPageResponse {
    #[serde(flatten)]
    pub page: RecordPage,
    /// Human-readable date range, empty when no range is set.
    pub date_filter: String,
}

impl RecordPageResponse {
    #[must_use]
    pub fn new(page: RecordPage, filter: &DateFilterState) -> Self {
        Self {
            page,
            date_filter: date_filter_summary(filter),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PhotoUploadResponse {
    pub photos: Vec<IncidentPhoto>,
    pub failures: Vec<PhotoFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<&'static str>,
}

impl From<PhotoUploadReport> for PhotoUploadResponse {
    fn from(report: PhotoUploadReport) -> Self {
        Self {
            warning: report.warning(),
            photos: report.uploaded,
            failures: report.failures,
        }
    }
}
