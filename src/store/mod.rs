mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::query::QuerySpec;
use crate::types::*;

/// Rows of one page plus the number of rows matching the filters,
/// ignoring the row window.
#[derive(Debug, Clone, PartialEq)]
pub struct RowPage {
    pub rows: Vec<Record>,
    pub total: u64,
}

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn list_users(&self) -> Result<Vec<User>>;

    // Profile operations
    fn upsert_profile(&self, profile: &Profile) -> Result<()>;
    fn get_profile(&self, user_id: &str) -> Result<Option<Profile>>;

    // Session operations
    fn create_session(&self, session: &SessionRecord) -> Result<()>;
    fn get_session_by_lookup(&self, lookup: &str) -> Result<Option<SessionRecord>>;
    fn delete_session(&self, id: &str) -> Result<bool>;

    // Record operations
    fn select_records(&self, spec: &QuerySpec) -> Result<RowPage>;
    fn get_record(&self, table: RecordTable, id: &str) -> Result<Option<Record>>;
    fn insert_record(&self, record: &NewRecord) -> Result<Record>;
    /// Rewrites every field of an existing row. Fails with `NotFound` if
    /// no row has that primary key.
    fn update_record(
        &self,
        id: &str,
        formatted_id: &str,
        fields: &RecordFields,
    ) -> Result<Record>;
    fn delete_record(&self, table: RecordTable, id: &str) -> Result<bool>;

    // Incident photo operations
    fn create_incident_photo(&self, photo: &IncidentPhoto) -> Result<()>;
    fn get_incident_photo(&self, id: &str) -> Result<Option<IncidentPhoto>>;
    fn list_incident_photos(&self, incident_id: &str) -> Result<Vec<IncidentPhoto>>;
    fn delete_incident_photo(&self, id: &str) -> Result<bool>;

    fn close(&self) -> Result<()>;
}
