use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::caller::Caller;
use crate::listing::get_visible_record;
use crate::photos::{PhotoSet, PhotoSource, StagedPhoto, delete_photo as remove_photo};
use crate::server::AppState;
use crate::server::dto::PhotoUploadResponse;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::store::Store;
use crate::types::{Record, RecordTable};

const MAX_PHOTO_SIZE: usize = 20 * 1024 * 1024;

fn load_incident(state: &AppState, caller: &Caller, id: &str) -> Result<Record, ApiError> {
    get_visible_record(
        state.store.as_ref(),
        RecordTable::IncidentReport,
        id,
        &caller.scope(),
    )
    .api_err("Failed to load incident")
}

/// Reads every `photo` field. An optional `source` field (`camera` or
/// `gallery`) applies to the photos that follow it.
async fn parse_photo_fields(multipart: &mut Multipart) -> Result<Vec<StagedPhoto>, ApiError> {
    let mut staged = Vec::new();
    let mut source = PhotoSource::Gallery;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart: {e}")))?
    {
        match field.name() {
            Some("photo") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read photo: {e}")))?;
                if data.len() > MAX_PHOTO_SIZE {
                    return Err(ApiError::payload_too_large(format!(
                        "Photo size ({} bytes) exceeds maximum allowed size ({MAX_PHOTO_SIZE} bytes)",
                        data.len()
                    )));
                }
                staged.push(StagedPhoto::new(data, content_type, source));
            }
            Some("source") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read source: {e}")))?;
                source = match value.trim() {
                    "camera" => PhotoSource::Camera,
                    "gallery" => PhotoSource::Gallery,
                    other => {
                        return Err(ApiError::bad_request(format!(
                            "Unknown photo source '{other}'"
                        )));
                    }
                };
            }
            _ => {}
        }
    }

    if staged.is_empty() {
        return Err(ApiError::bad_request("At least one photo field is required"));
    }
    Ok(staged)
}

/// GET /incidents/{id}/photos
pub async fn list_photos(
    caller: Caller,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let incident = load_incident(&state, &caller, &id)?;
    let photos = state
        .store
        .list_incident_photos(incident.id())
        .api_err("Failed to list photos")?;

    Ok(Json(ApiResponse::success(photos)))
}

/// POST /incidents/{id}/photos - Uploads each photo independently; partial
/// failure is reported, not rolled back.
pub async fn upload_photos(
    caller: Caller,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let incident = load_incident(&state, &caller, &id)?;
    let staged = parse_photo_fields(&mut multipart).await?;

    let existing = state
        .store
        .list_incident_photos(incident.id())
        .api_err("Failed to list photos")?;
    let mut set = PhotoSet::from_uploaded(existing);
    for photo in staged {
        set.stage(photo);
    }

    let report = set
        .upload_staged(state.store.as_ref(), &state.photos, incident.id())
        .await;
    let status = if report.uploaded.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    Ok((
        status,
        Json(ApiResponse::success(PhotoUploadResponse::from(report))),
    ))
}

/// DELETE /incidents/{id}/photos/{photo_id}
pub async fn delete_photo(
    caller: Caller,
    State(state): State<Arc<AppState>>,
    Path((id, photo_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let incident = load_incident(&state, &caller, &id)?;
    let photo = state
        .store
        .get_incident_photo(&photo_id)
        .api_err("Failed to load photo")?
        .filter(|photo| photo.incident_id == incident.id())
        .or_not_found("Photo not found")?;

    remove_photo(state.store.as_ref(), &state.photos, &photo)
        .await
        .api_err("Failed to delete photo")?;

    Ok(StatusCode::NO_CONTENT)
}
