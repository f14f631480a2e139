use axum::{
    extract::{Path, Query},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::{CommentTask, NewCommentTask, TaskStatus};
use crate::middleware::{ActiveSession, ApiResponse, ApiResult};

use super::touched;

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    #[serde(default)]
    pub stage_id: Option<Uuid>,
}

/// GET /api/projects/:id/tasks[?stage_id=] - Comments and tasks, newest first
pub async fn list(
    ActiveSession(session): ActiveSession,
    Path(project_id): Path<Uuid>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Vec<CommentTask>> {
    Ok(ApiResponse::success(session.get_comment_tasks(project_id, query.stage_id).await))
}

/// POST /api/tasks - Add a comment or task authored by the caller.
/// Responds with the project's comment tasks after the write.
pub async fn create(
    ActiveSession(session): ActiveSession,
    Json(task): Json<NewCommentTask>,
) -> ApiResult<Vec<CommentTask>> {
    let project_id = task.project_id;
    session.add_comment_task(task).await?;
    Ok(ApiResponse::created(session.get_comment_tasks(project_id, None).await))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: TaskStatus,
}

/// PUT /api/tasks/:id/status
pub async fn update_status(
    ActiveSession(session): ActiveSession,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusRequest>,
) -> ApiResult<Value> {
    session.update_comment_task_status(id, body.status).await?;
    Ok(ApiResponse::success(touched(id)))
}
