//! Incident photos: the blob store and the attach/upload workflow.
//!
//! Photos are staged locally while an incident is being written, then
//! uploaded one by one once the incident row exists. The incident and its
//! photos are independent writes; a failed photo never rolls back the
//! incident.

mod storage;

pub use storage::{BlobError, PhotoStorage, StoredBlob, content_type_for, extension_for};

use bytes::Bytes;
use chrono::{SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::access::BusinessUnitState;
use crate::error::{Error, Result};
use crate::records;
use crate::store::Store;
use crate::types::{CurrentUser, IncidentPhoto, Record, RecordFields, RecordTable};

pub const INCIDENT_PHOTO_BUCKET: &str = "incident-photos";

/// Shown once after a save when at least one photo did not make it.
pub const PARTIAL_UPLOAD_WARNING: &str = "Some photos failed to upload";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoSource {
    Camera,
    Gallery,
}

/// A photo picked on the device but not uploaded yet.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedPhoto {
    pub bytes: Bytes,
    pub content_type: String,
    pub source: PhotoSource,
}

impl StagedPhoto {
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>, source: PhotoSource) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PhotoSlot {
    Staged(StagedPhoto),
    Uploaded(IncidentPhoto),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoFailure {
    pub index: usize,
    pub message: String,
}

/// Outcome of one upload pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhotoUploadReport {
    pub uploaded: Vec<IncidentPhoto>,
    pub failures: Vec<PhotoFailure>,
}

impl PhotoUploadReport {
    #[must_use]
    pub fn warning(&self) -> Option<&'static str> {
        (!self.failures.is_empty()).then_some(PARTIAL_UPLOAD_WARNING)
    }
}

/// The photos shown on an incident form, in display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoSet {
    slots: Vec<PhotoSlot>,
}

impl PhotoSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Photos already attached to a saved incident, for editing.
    #[must_use]
    pub fn from_uploaded(photos: Vec<IncidentPhoto>) -> Self {
        Self {
            slots: photos.into_iter().map(PhotoSlot::Uploaded).collect(),
        }
    }

    pub fn stage(&mut self, photo: StagedPhoto) {
        self.slots.push(PhotoSlot::Staged(photo));
    }

    #[must_use]
    pub fn slots(&self) -> &[PhotoSlot] {
        &self.slots
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn staged_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, PhotoSlot::Staged(_)))
            .count()
    }

    /// Uploads every staged slot and links it to `incident_id`. Successful
    /// slots become `Uploaded`; failed ones stay staged for another attempt.
    pub async fn upload_staged(
        &mut self,
        store: &dyn Store,
        blobs: &PhotoStorage,
        incident_id: &str,
    ) -> PhotoUploadReport {
        let mut report = PhotoUploadReport::default();

        for (index, slot) in self.slots.iter_mut().enumerate() {
            let PhotoSlot::Staged(staged) = slot else {
                continue;
            };
            match upload_photo(store, blobs, incident_id, index, staged).await {
                Ok(photo) => {
                    report.uploaded.push(photo.clone());
                    *slot = PhotoSlot::Uploaded(photo);
                }
                Err(e) => {
                    warn!("Photo {index} for incident {incident_id} failed to upload: {e}");
                    report.failures.push(PhotoFailure {
                        index,
                        message: e.user_message(),
                    });
                }
            }
        }

        if !report.uploaded.is_empty() {
            info!(
                "Uploaded {} photo(s) for incident {incident_id}",
                report.uploaded.len()
            );
        }
        report
    }

    /// Removes the photo at `index`. Uploaded photos are deleted from the
    /// blob store and unlinked; staged ones are just dropped.
    pub async fn remove(
        &mut self,
        index: usize,
        store: &dyn Store,
        blobs: &PhotoStorage,
    ) -> Result<()> {
        let slot = self.slots.get(index).ok_or_else(|| {
            Error::BadRequest(format!("no photo at position {index}"))
        })?;
        if let PhotoSlot::Uploaded(photo) = slot {
            delete_photo(store, blobs, photo).await?;
        }
        self.slots.remove(index);
        Ok(())
    }
}

/// Object name for a photo: `<incident_id>/<index>_<millis>.<ext>`.
#[must_use]
pub fn photo_object_name(incident_id: &str, index: usize, content_type: &str) -> String {
    format!(
        "{incident_id}/{index}_{}.{}",
        Utc::now().timestamp_millis(),
        extension_for(content_type)
    )
}

/// Uploads one photo and inserts its linking row.
pub async fn upload_photo(
    store: &dyn Store,
    blobs: &PhotoStorage,
    incident_id: &str,
    index: usize,
    photo: &StagedPhoto,
) -> Result<IncidentPhoto> {
    let object_name = photo_object_name(incident_id, index, &photo.content_type);
    let stored = blobs
        .upload(
            INCIDENT_PHOTO_BUCKET,
            &object_name,
            &photo.bytes,
            &photo.content_type,
        )
        .await?;

    let row = IncidentPhoto {
        id: Uuid::new_v4().to_string(),
        incident_id: incident_id.to_string(),
        object_path: stored.object_name,
        url: stored.url,
        content_type: photo.content_type.clone(),
        size_bytes: stored.size_bytes,
        sha256: stored.sha256,
        position: index as i64,
        created_at: Utc::now().trunc_subsecs(6),
    };

    if let Err(e) = store.create_incident_photo(&row) {
        if let Err(cleanup) = blobs.remove(INCIDENT_PHOTO_BUCKET, &row.object_path).await {
            warn!("Failed to clean up orphaned blob {}: {cleanup}", row.object_path);
        }
        return Err(Error::Upload(e.user_message()));
    }
    Ok(row)
}

/// Removes the blob behind `photo`, then its linking row.
pub async fn delete_photo(
    store: &dyn Store,
    blobs: &PhotoStorage,
    photo: &IncidentPhoto,
) -> Result<()> {
    if !blobs.remove(INCIDENT_PHOTO_BUCKET, &photo.object_path).await? {
        warn!("Photo blob {} was already gone", photo.object_path);
    }
    store.delete_incident_photo(&photo.id)?;
    Ok(())
}

/// Saves an incident report, then uploads its staged photos.
///
/// The incident row is committed before any upload starts and stays
/// committed whatever happens to the photos.
pub async fn save_incident_with_photos(
    store: &dyn Store,
    blobs: &PhotoStorage,
    user: Option<&CurrentUser>,
    unit_state: &BusinessUnitState,
    fields: RecordFields,
    edit: Option<&Record>,
    photos: &mut PhotoSet,
) -> Result<(Record, PhotoUploadReport)> {
    if fields.table() != RecordTable::IncidentReport {
        return Err(Error::BadRequest(format!(
            "photos can only be attached to incident reports, not {}",
            fields.table()
        )));
    }

    let record = records::save(store, user, unit_state, fields, edit)?;
    let report = photos.upload_staged(store, blobs, record.id()).await;
    Ok((record, report))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_warning_only_on_failure() {
        let mut report = PhotoUploadReport::default();
        assert_eq!(report.warning(), None);
        report.failures.push(PhotoFailure {
            index: 1,
            message: "empty upload".to_string(),
        });
        assert_eq!(report.warning(), Some("Some photos failed to upload"));
    }

    #[test]
    fn test_object_name_shape() {
        let name = photo_object_name("inc-42", 2, "image/png");
        let (incident, file) = name.split_once('/').unwrap();
        assert_eq!(incident, "inc-42");
        let (stem, ext) = file.rsplit_once('.').unwrap();
        assert_eq!(ext, "png");
        let (index, millis) = stem.split_once('_').unwrap();
        assert_eq!(index, "2");
        assert!(millis.parse::<i64>().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_removing_staged_photo_touches_nothing_remote() {
        let temp_dir = TempDir::new().unwrap();
        let store = crate::store::SqliteStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        let blobs = PhotoStorage::new(temp_dir.path(), "http://localhost");

        let mut set = PhotoSet::new();
        set.stage(StagedPhoto::new(vec![1, 2, 3], "image/jpeg", PhotoSource::Camera));
        set.stage(StagedPhoto::new(vec![4, 5], "image/png", PhotoSource::Gallery));

        set.remove(0, &store, &blobs).await.unwrap();
        assert_eq!(set.len(), 1);
        assert!(matches!(
            &set.slots()[0],
            PhotoSlot::Staged(photo) if photo.source == PhotoSource::Gallery
        ));
        assert!(matches!(
            set.remove(5, &store, &blobs).await,
            Err(Error::BadRequest(_))
        ));
    }
}
