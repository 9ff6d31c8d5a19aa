use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{delete, get, post},
};

use super::{auth, photos, records, storage};
use crate::auth::Identity;
use crate::config::ServerConfig;
use crate::photos::PhotoStorage;
use crate::store::Store;

/// Multipart photo uploads may carry several camera images.
const MAX_PHOTO_BODY: usize = 50 * 1024 * 1024;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub identity: Identity,
    pub photos: PhotoStorage,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &ServerConfig) -> Self {
        Self {
            identity: Identity::new(store.clone()).with_session_ttl(config.session_ttl()),
            photos: PhotoStorage::new(&config.storage_dir(), config.base_url()),
            store,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Session
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/sign-out", post(auth::sign_out))
        .route("/me", get(auth::me))
        // Records
        .route(
            "/records/{table}",
            get(records::list_records).post(records::create_record),
        )
        .route(
            "/records/{table}/{id}",
            get(records::get_record)
                .put(records::update_record)
                .delete(records::delete_record),
        )
        // Incident photos
        .route(
            "/incidents/{id}/photos",
            get(photos::list_photos)
                .post(photos::upload_photos)
                .layer(DefaultBodyLimit::max(MAX_PHOTO_BODY)),
        )
        .route(
            "/incidents/{id}/photos/{photo_id}",
            delete(photos::delete_photo),
        )
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_router())
        .route("/storage/{bucket}/{*path}", get(storage::get_object))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
