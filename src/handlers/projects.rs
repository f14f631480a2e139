use axum::{
    extract::{Path, Query},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::{NewProject, Project, ProjectPatch, Stage};
use crate::middleware::{ActiveSession, ApiResponse, ApiResult};
use crate::session::{EmployeeWorkload, ProjectQuery};

use super::{touched, ReviewRequest};

/// GET /api/projects - Cached projects filtered by search, status, employee, priority
pub async fn list(
    ActiveSession(session): ActiveSession,
    Query(query): Query<ProjectQuery>,
) -> ApiResult<Vec<Project>> {
    Ok(ApiResponse::success(session.filter_projects(&query).await))
}

/// GET /api/my-projects - Projects visible to the caller's role
pub async fn mine(ActiveSession(session): ActiveSession) -> ApiResult<Vec<Project>> {
    Ok(ApiResponse::success(session.my_projects().await))
}

/// POST /api/projects - Create a project with its default stages
pub async fn create(
    ActiveSession(session): ActiveSession,
    Json(project): Json<NewProject>,
) -> ApiResult<Value> {
    let id = session.create_project(project).await?;
    Ok(ApiResponse::created(touched(id)))
}

/// PATCH /api/projects/:id
pub async fn update(
    ActiveSession(session): ActiveSession,
    Path(id): Path<Uuid>,
    Json(patch): Json<ProjectPatch>,
) -> ApiResult<Value> {
    session.update_project(id, patch).await?;
    Ok(ApiResponse::success(touched(id)))
}

/// DELETE /api/projects/:id - Removes the project and everything under it
pub async fn delete(ActiveSession(session): ActiveSession, Path(id): Path<Uuid>) -> ApiResult<Value> {
    session.delete_project(id).await?;
    Ok(ApiResponse::success(touched(id)))
}

/// GET /api/projects/:id/stages - Stages in lifecycle order
pub async fn stages(ActiveSession(session): ActiveSession, Path(id): Path<Uuid>) -> ApiResult<Vec<Stage>> {
    Ok(ApiResponse::success(session.get_stages(id).await))
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub progress: i32,
}

/// PUT /api/stages/:id/progress
pub async fn stage_progress(
    ActiveSession(session): ActiveSession,
    Path(id): Path<Uuid>,
    Json(body): Json<ProgressRequest>,
) -> ApiResult<Value> {
    session.update_stage_progress(id, body.progress).await?;
    Ok(ApiResponse::success(json!({ "id": id, "progress_percentage": body.progress })))
}

/// PUT /api/stages/:id/approval - Approve or reject, optionally with a comment task
pub async fn stage_approval(
    ActiveSession(session): ActiveSession,
    Path(id): Path<Uuid>,
    Json(body): Json<ReviewRequest>,
) -> ApiResult<Value> {
    session.update_stage_approval(id, body.status, body.comment).await?;
    Ok(ApiResponse::success(json!({ "id": id, "approval_status": body.status })))
}

/// GET /api/workload - Project count and mean progress per employee
pub async fn workload(ActiveSession(session): ActiveSession) -> ApiResult<Vec<EmployeeWorkload>> {
    Ok(ApiResponse::success(session.employee_workload().await))
}
