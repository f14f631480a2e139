use axum::{extract::State, Extension};
use serde_json::{json, Value};
use tracing::info;

use crate::middleware::{ActiveSession, ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;
use crate::session::DataSnapshot;

/// POST /auth/session - Open (or resume) the caller's data session and load it
pub async fn open(
    State(state): State<AppState>,
    Extension(AuthUser(identity)): Extension<AuthUser>,
) -> ApiResult<DataSnapshot> {
    info!(user = %identity.id, role = %identity.role, "sign-in");
    let session = state.sign_in(identity).await?;
    Ok(ApiResponse::success(session.snapshot().await))
}

/// DELETE /auth/session - Close the caller's data session
pub async fn close(
    State(state): State<AppState>,
    Extension(AuthUser(identity)): Extension<AuthUser>,
) -> ApiResult<Value> {
    let closed = state.sign_out(identity.id).await;
    info!(user = %identity.id, closed, "sign-out");
    Ok(ApiResponse::success(json!({ "closed": closed })))
}

/// GET /api/data - Everything currently cached for the caller
pub async fn snapshot(ActiveSession(session): ActiveSession) -> ApiResult<DataSnapshot> {
    Ok(ApiResponse::success(session.snapshot().await))
}

/// POST /api/data/refresh - Reload all collections, then return them
pub async fn refresh(ActiveSession(session): ActiveSession) -> ApiResult<DataSnapshot> {
    session.refresh_data().await?;
    Ok(ApiResponse::success(session.snapshot().await))
}
