use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::stage::ApprovalStatus;
use super::user::Role;
use super::Patch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrochureStatus {
    Draft,
    ReadyForDesign,
    InDesign,
    Completed,
}

impl BrochureStatus {
    /// Statuses a designer works from.
    pub fn awaiting_review(&self) -> bool {
        matches!(self, BrochureStatus::ReadyForDesign | BrochureStatus::InDesign)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrochureProject {
    pub id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    pub status: BrochureStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrochureProjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BrochureStatus>,
}

impl Patch for BrochureProjectPatch {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrochurePage {
    pub id: Uuid,
    pub project_id: Uuid,
    pub page_number: i32,
    pub approval_status: ApprovalStatus,
    pub is_locked: bool,
    pub locked_by: Option<Uuid>,
    pub locked_by_name: Option<String>,
    pub locked_at: Option<DateTime<Utc>>,
    pub content: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BrochurePage {
    /// Whether someone other than `user_id` currently holds the lock.
    pub fn locked_by_other(&self, user_id: Uuid) -> bool {
        self.is_locked && self.locked_by != Some(user_id)
    }
}

/// Page content keyed by `(project_id, page_number)`; saving an existing
/// page number overwrites it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBrochurePage {
    pub project_id: Uuid,
    pub page_number: i32,
    #[serde(default = "empty_content")]
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_status: Option<ApprovalStatus>,
}

fn empty_content() -> Value {
    Value::Object(Default::default())
}

impl NewBrochurePage {
    pub fn new(project_id: Uuid, page_number: i32, content: Value) -> Self {
        Self { project_id, page_number, content, approval_status: None }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.page_number < 1 {
            return Err(format!("page_number must be at least 1, got {}", self.page_number));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageAction {
    Comment,
    Lock,
    Unlock,
    Approval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageComment {
    pub id: Uuid,
    pub page_id: Uuid,
    pub text: String,
    pub added_by: Uuid,
    pub author_name: String,
    pub author_role: Role,
    pub timestamp: DateTime<Utc>,
    pub marked_done: bool,
    pub action_type: Option<PageAction>,
}

/// Comment on a page as entered by a user; authorship comes from the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPageComment {
    pub page_id: Uuid,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<PageAction>,
}

impl NewPageComment {
    pub fn new(page_id: Uuid, text: impl Into<String>) -> Self {
        Self { page_id, text: text.into(), action_type: Some(PageAction::Comment) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn statuses_use_wire_names() {
        assert_eq!(serde_json::to_value(BrochureStatus::ReadyForDesign).unwrap(), json!("ready_for_design"));
        assert_eq!(serde_json::to_value(PageAction::Approval).unwrap(), json!("approval"));
        let none: Option<PageAction> = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn review_queue_statuses() {
        assert!(BrochureStatus::ReadyForDesign.awaiting_review());
        assert!(BrochureStatus::InDesign.awaiting_review());
        assert!(!BrochureStatus::Draft.awaiting_review());
        assert!(!BrochureStatus::Completed.awaiting_review());
    }

    #[test]
    fn page_content_defaults_to_empty_object() {
        let page: NewBrochurePage = serde_json::from_value(json!({
            "project_id": Uuid::nil(),
            "page_number": 1
        }))
        .unwrap();
        assert_eq!(page.content, json!({}));
    }
}
