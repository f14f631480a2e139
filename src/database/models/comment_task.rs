use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Open,
    InProgress,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentTask {
    pub id: Uuid,
    pub stage_id: Option<Uuid>,
    pub project_id: Uuid,
    pub text: String,
    pub added_by: Uuid,
    pub author_name: String,
    pub author_role: Role,
    pub status: TaskStatus,
    pub assigned_to: Option<Uuid>,
    pub deadline: Option<NaiveDate>,
    pub timestamp: DateTime<Utc>,
    pub is_global: bool,
}

/// Comment or task as entered by a user; authorship is stamped from the
/// session identity when it is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCommentTask {
    pub project_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<Uuid>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_global: Option<bool>,
}

impl NewCommentTask {
    pub fn new(project_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            project_id,
            stage_id: None,
            text: text.into(),
            status: None,
            assigned_to: None,
            deadline: None,
            is_global: None,
        }
    }

    pub fn on_stage(mut self, stage_id: Uuid) -> Self {
        self.stage_id = Some(stage_id);
        self
    }
}
