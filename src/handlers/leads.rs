use axum::{extract::Path, Json};
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::{Lead, LeadPatch, NewLead};
use crate::middleware::{ActiveSession, ApiResponse, ApiResult};

use super::touched;

/// POST /api/leads - Responds with the caller's lead list, which is empty
/// for non-managers.
pub async fn create(ActiveSession(session): ActiveSession, Json(lead): Json<NewLead>) -> ApiResult<Vec<Lead>> {
    session.create_lead(lead).await?;
    Ok(ApiResponse::created(session.collections().await.leads.clone()))
}

/// PATCH /api/leads/:id
pub async fn update(
    ActiveSession(session): ActiveSession,
    Path(id): Path<Uuid>,
    Json(patch): Json<LeadPatch>,
) -> ApiResult<Value> {
    session.update_lead(id, patch).await?;
    Ok(ApiResponse::success(touched(id)))
}

/// DELETE /api/leads/:id
pub async fn delete(ActiveSession(session): ActiveSession, Path(id): Path<Uuid>) -> ApiResult<Value> {
    session.delete_lead(id).await?;
    Ok(ApiResponse::success(touched(id)))
}
