use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;
use crate::server::AppState;
use crate::session::DataSession;

use super::AuthUser;

/// The caller's open data session. Requires `jwt_auth_middleware` upstream
/// and a prior `POST /auth/session`.
pub struct ActiveSession(pub Arc<DataSession>);

#[async_trait]
impl FromRequestParts<AppState> for ActiveSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(identity) = parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Missing authenticated user"))?;

        let session = state
            .session_for(&identity)
            .await
            .map_err(|_| ApiError::unauthorized("No open session; POST /auth/session first"))?;
        Ok(ActiveSession(session))
    }
}
