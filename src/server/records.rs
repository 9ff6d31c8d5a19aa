use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value;

use super::caller::Caller;
use crate::listing::{get_visible_record, list_records as list_page};
use crate::records;
use crate::server::AppState;
use crate::server::dto::{ListRecordsParams, RecordPageResponse};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::types::{RecordFields, RecordTable};

fn parse_table(table: &str) -> Result<RecordTable, ApiError> {
    table.parse::<RecordTable>().map_err(ApiError::from)
}

/// GET /records/{table}
pub async fn list_records(
    caller: Caller,
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
    Query(params): Query<ListRecordsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let table = parse_table(&table)?;
    let filter = params.date_filter();

    let page = list_page(
        state.store.as_ref(),
        table,
        &caller.scope(),
        &filter,
        params.search.as_deref().unwrap_or(""),
        params.page.unwrap_or(1),
    )
    .api_err("Failed to list records")?;

    Ok(Json(ApiResponse::success(RecordPageResponse::new(
        page, &filter,
    ))))
}

/// POST /records/{table}
pub async fn create_record(
    caller: Caller,
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let table = parse_table(&table)?;
    let fields = RecordFields::from_json(table, body)?;

    let record = records::save(
        state.store.as_ref(),
        Some(&caller.user),
        &caller.unit,
        fields,
        None,
    )
    .api_err("Failed to save record")?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))))
}

/// GET /records/{table}/{id}
pub async fn get_record(
    caller: Caller,
    State(state): State<Arc<AppState>>,
    Path((table, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let table = parse_table(&table)?;
    let record = get_visible_record(state.store.as_ref(), table, &id, &caller.scope())
        .api_err("Failed to load record")?;

    Ok(Json(ApiResponse::success(record)))
}

/// PUT /records/{table}/{id} - Rewrites every field, keeping the row's identity
pub async fn update_record(
    caller: Caller,
    State(state): State<Arc<AppState>>,
    Path((table, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let table = parse_table(&table)?;
    let store = state.store.as_ref();
    let existing =
        get_visible_record(store, table, &id, &caller.scope()).api_err("Failed to load record")?;
    let fields = RecordFields::from_json(table, body)?;

    let record = records::save(
        store,
        Some(&caller.user),
        &caller.unit,
        fields,
        Some(&existing),
    )
    .api_err("Failed to save record")?;

    Ok(Json(ApiResponse::success(record)))
}

/// DELETE /records/{table}/{id}
pub async fn delete_record(
    caller: Caller,
    State(state): State<Arc<AppState>>,
    Path((table, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let table = parse_table(&table)?;
    let store = state.store.as_ref();
    get_visible_record(store, table, &id, &caller.scope()).api_err("Failed to load record")?;

    records::delete_record(store, &state.photos, table, &id)
        .await
        .api_err("Failed to delete record")?;

    Ok(StatusCode::NO_CONTENT)
}
