// Route handlers, grouped by the part of the dashboard they serve.
//
// Public (no auth) → session (bearer token, opens the data session) →
// everything under /api (bearer token plus an open session).

pub mod brochures;
pub mod files;
pub mod leads;
pub mod projects;
pub mod public;
pub mod session;
pub mod tasks;

use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::ReviewDecision;

/// Body of the stage and page approval routes
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub status: ReviewDecision,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Response body for commands that only touch one row
pub(crate) fn touched(id: Uuid) -> Value {
    json!({ "id": id })
}
