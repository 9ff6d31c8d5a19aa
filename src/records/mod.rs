//! Creating, editing and deleting records.

mod id;

pub use id::generate_formatted_id;

use tracing::{info, warn};
use uuid::Uuid;

use crate::access::BusinessUnitState;
use crate::error::{Error, Result};
use crate::photos::{INCIDENT_PHOTO_BUCKET, PhotoStorage};
use crate::store::Store;
use crate::types::{CurrentUser, NewRecord, Record, RecordFields, RecordTable};

/// Saves one record.
///
/// With `edit`, the existing row is rewritten in place under its primary key
/// and keeps its metadata; an empty formatted ID is backfilled. Without
/// `edit`, a new row is inserted stamped with the user and, on scoped tables,
/// the user's business unit.
pub fn save(
    store: &dyn Store,
    user: Option<&CurrentUser>,
    unit_state: &BusinessUnitState,
    fields: RecordFields,
    edit: Option<&Record>,
) -> Result<Record> {
    let user = user.ok_or(Error::NoUser)?;
    let business_unit = unit_state.settled_unit()?;
    let table = fields.table();
    fields.validate()?;

    if let Some(existing) = edit {
        if existing.table != table {
            return Err(Error::BadRequest(format!(
                "cannot save {table} fields over a {} record",
                existing.table
            )));
        }
        let formatted_id = if existing.meta.formatted_id.trim().is_empty() {
            generate_formatted_id(table)
        } else {
            existing.meta.formatted_id.clone()
        };

        let record = store.update_record(existing.id(), &formatted_id, &fields)?;
        info!("{} updated {} {}", user.email, table, record.meta.formatted_id);
        return Ok(record);
    }

    if table.is_scoped() && business_unit.is_none() {
        return Err(Error::ProfileResolution(
            "no business unit assigned to this account".to_string(),
        ));
    }

    let record = store.insert_record(&NewRecord {
        id: Uuid::new_v4().to_string(),
        formatted_id: generate_formatted_id(table),
        created_by: user.id.clone(),
        business_unit: business_unit.map(str::to_string),
        fields,
    })?;
    info!("{} created {} {}", user.email, table, record.meta.formatted_id);
    Ok(record)
}

/// Deletes a record. For incident reports the attached photos go too; blob
/// removal is best-effort and only logged on failure.
pub async fn delete_record(
    store: &dyn Store,
    blobs: &PhotoStorage,
    table: RecordTable,
    id: &str,
) -> Result<bool> {
    if table == RecordTable::IncidentReport {
        for photo in store.list_incident_photos(id)? {
            if let Err(e) = blobs.remove(INCIDENT_PHOTO_BUCKET, &photo.object_path).await {
                warn!("Failed to remove photo blob {}: {e}", photo.object_path);
            }
            if let Err(e) = store.delete_incident_photo(&photo.id) {
                warn!("Failed to delete photo row {}: {e}", photo.id);
            }
        }
    }

    let deleted = store.delete_record(table, id)?;
    if deleted {
        info!("Deleted {table} {id}");
    }
    Ok(deleted)
}
