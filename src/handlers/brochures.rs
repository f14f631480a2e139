use axum::{extract::Path, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::{
    ApprovalStatus, BrochurePage, BrochureProject, BrochureProjectPatch, NewBrochurePage, NewPageComment, PageAction,
    PageComment,
};
use crate::middleware::{ActiveSession, ApiResponse, ApiResult};

use super::{touched, ReviewRequest};

#[derive(Debug, Deserialize)]
pub struct CreateBrochureRequest {
    pub client_id: Uuid,
    pub client_name: String,
}

/// POST /api/brochures - Start a draft brochure for a client
pub async fn create(
    ActiveSession(session): ActiveSession,
    Json(body): Json<CreateBrochureRequest>,
) -> ApiResult<Value> {
    let id = session.create_brochure_project(body.client_id, &body.client_name).await?;
    Ok(ApiResponse::created(touched(id)))
}

/// PATCH /api/brochures/:id
pub async fn update(
    ActiveSession(session): ActiveSession,
    Path(id): Path<Uuid>,
    Json(patch): Json<BrochureProjectPatch>,
) -> ApiResult<Value> {
    session.update_brochure_project(id, patch).await?;
    Ok(ApiResponse::success(touched(id)))
}

/// GET /api/brochure-review - Brochures ready for or in design
pub async fn review_queue(ActiveSession(session): ActiveSession) -> ApiResult<Vec<BrochureProject>> {
    Ok(ApiResponse::success(session.get_brochure_projects_for_review().await))
}

/// GET /api/brochures/:id/pages - Pages in page order
pub async fn pages(ActiveSession(session): ActiveSession, Path(id): Path<Uuid>) -> ApiResult<Vec<BrochurePage>> {
    Ok(ApiResponse::success(session.get_brochure_pages(id).await))
}

#[derive(Debug, Deserialize)]
pub struct SavePageRequest {
    pub page_number: i32,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub approval_status: Option<ApprovalStatus>,
}

/// PUT /api/brochures/:id/pages - Create or overwrite a page by page number.
/// Responds with the brochure's pages.
pub async fn save_page(
    ActiveSession(session): ActiveSession,
    Path(project_id): Path<Uuid>,
    Json(body): Json<SavePageRequest>,
) -> ApiResult<Vec<BrochurePage>> {
    let content = if body.content.is_null() { json!({}) } else { body.content };
    let mut page = NewBrochurePage::new(project_id, body.page_number, content);
    page.approval_status = body.approval_status;

    session.save_brochure_page(page).await?;
    Ok(ApiResponse::success(session.get_brochure_pages(project_id).await))
}

/// GET /api/pages/:id/comments - Oldest first
pub async fn comments(ActiveSession(session): ActiveSession, Path(id): Path<Uuid>) -> ApiResult<Vec<PageComment>> {
    Ok(ApiResponse::success(session.get_page_comments(id).await))
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
    #[serde(default)]
    pub action_type: Option<PageAction>,
}

/// POST /api/pages/:id/comments - Responds with the page's comments
pub async fn add_comment(
    ActiveSession(session): ActiveSession,
    Path(page_id): Path<Uuid>,
    Json(body): Json<CommentRequest>,
) -> ApiResult<Vec<PageComment>> {
    let mut comment = NewPageComment::new(page_id, body.text);
    if body.action_type.is_some() {
        comment.action_type = body.action_type;
    }

    session.add_page_comment(comment).await?;
    Ok(ApiResponse::created(session.get_page_comments(page_id).await))
}

/// PUT /api/pages/:id/approval
pub async fn approve(
    ActiveSession(session): ActiveSession,
    Path(id): Path<Uuid>,
    Json(body): Json<ReviewRequest>,
) -> ApiResult<Value> {
    session.approve_brochure_page(id, body.status, body.comment).await?;
    Ok(ApiResponse::success(json!({ "id": id, "approval_status": body.status })))
}

/// POST /api/pages/:id/lock - 423 when someone else holds the lock
pub async fn lock(ActiveSession(session): ActiveSession, Path(id): Path<Uuid>) -> ApiResult<Value> {
    session.lock_brochure_page(id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "is_locked": true })))
}

/// DELETE /api/pages/:id/lock
pub async fn unlock(ActiveSession(session): ActiveSession, Path(id): Path<Uuid>) -> ApiResult<Value> {
    session.unlock_brochure_page(id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "is_locked": false })))
}
