use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use super::caller::Caller;
use crate::auth::RequireSession;
use crate::server::AppState;
use crate::server::dto::{MeResponse, SignInRequest, SignInResponse};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};

/// POST /auth/sign-in
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignInRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let signed_in = state
        .identity
        .sign_in(&req.email, &req.password)
        .api_err("Failed to sign in")?;

    Ok(Json(ApiResponse::success(SignInResponse {
        token: signed_in.token,
        session: signed_in.session,
    })))
}

/// POST /auth/sign-out
pub async fn sign_out(
    RequireSession(session): RequireSession,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .identity
        .sign_out(&session)
        .api_err("Failed to sign out")?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /me
pub async fn me(caller: Caller) -> impl IntoResponse {
    let scope = caller.scope();
    Json(ApiResponse::success(MeResponse {
        can_see_all_data: caller.unit.can_see_all_data(),
        business_unit: caller.unit.business_unit,
        user: caller.user,
        scope,
    }))
}
