use axum::{
    extract::{Path, Query},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::{DownloadHistory, FilePatch, NewFile, ProjectFile};
use crate::middleware::{ActiveSession, ApiResponse, ApiResult};

use super::touched;

/// POST /api/files - Record an uploaded file. Responds with the project's files.
pub async fn upload(
    ActiveSession(session): ActiveSession,
    Json(file): Json<NewFile>,
) -> ApiResult<Vec<ProjectFile>> {
    let project_id = file.project_id;
    session.upload_file(file).await?;

    let files: Vec<ProjectFile> = session
        .collections()
        .await
        .files
        .iter()
        .filter(|f| f.project_id == project_id)
        .cloned()
        .collect();
    Ok(ApiResponse::created(files))
}

/// PATCH /api/files/:id
pub async fn update(
    ActiveSession(session): ActiveSession,
    Path(id): Path<Uuid>,
    Json(patch): Json<FilePatch>,
) -> ApiResult<Value> {
    session.update_file_metadata(id, patch).await?;
    Ok(ApiResponse::success(touched(id)))
}

/// POST /api/files/:id/download - Count a download and log it.
/// Responds with the file's download history.
pub async fn download(
    ActiveSession(session): ActiveSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<DownloadHistory>> {
    session.download_file(id).await?;
    Ok(ApiResponse::success(session.get_download_history(Some(id)).await))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub file_id: Option<Uuid>,
}

/// GET /api/downloads[?file_id=] - Download history, newest first
pub async fn history(
    ActiveSession(session): ActiveSession,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<DownloadHistory>> {
    Ok(ApiResponse::success(session.get_download_history(query.file_id).await))
}
