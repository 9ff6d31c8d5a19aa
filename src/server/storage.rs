use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;
use tracing::warn;

use crate::photos::{BlobError, content_type_for};
use crate::server::AppState;
use crate::server::response::ApiError;

/// GET /storage/{bucket}/{*path} - Public URL target for stored blobs
pub async fn get_object(
    State(state): State<Arc<AppState>>,
    Path((bucket, path)): Path<(String, String)>,
) -> Response {
    let path = path.trim_start_matches('/');
    let (reader, size) = match state.photos.get(&bucket, path).await {
        Ok(result) => result,
        Err(BlobError::NotFound | BlobError::InvalidPath(_)) => {
            return ApiError::not_found("Object not found").into_response();
        }
        Err(e) => {
            warn!("Blob storage error: {e}");
            return ApiError::internal("Storage error").into_response();
        }
    };

    let stream = ReaderStream::new(reader);
    let body = Body::from_stream(stream);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(path))
        .header(header::CONTENT_LENGTH, size)
        .header("X-Content-Type-Options", "nosniff")
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
