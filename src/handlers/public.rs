use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::server::AppState;

/// GET / - Service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "XeeTrack API (Rust)",
            "version": version,
            "description": "Project dashboard data layer: projects, stages, tasks, files, leads and brochure review",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "session": "/auth/session (bearer token - open or close the data session)",
                "data": "/api/data, /api/data/refresh (session)",
                "projects": "/api/projects[/:id], /api/my-projects, /api/stages/:id/*, /api/tasks (session)",
                "files": "/api/files[/:id], /api/downloads (session)",
                "leads": "/api/leads[/:id] (session, managers)",
                "brochures": "/api/brochures[/:id], /api/brochure-review, /api/pages/:id/* (session)",
            }
        }
    }))
}

/// GET /health - Store reachability
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let backend = state.store().backend();

    match state.store().health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "store": backend,
                    "sessions": state.open_sessions().await
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Store health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": true,
                    "message": "store unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "store": backend
                    }
                })),
            )
        }
    }
}
