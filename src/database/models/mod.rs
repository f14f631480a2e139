//! Typed rows for the ten dashboard tables, plus the insert payloads
//! (`New*`) and partial updates (`*Patch`) the data session accepts.
//!
//! Patch merge rule: a field that is present overwrites the stored value
//! (an explicit `null` clears a nullable column); an absent field is left
//! unchanged. Patches never carry `id` or `created_at`.

pub mod brochure;
pub mod comment_task;
pub mod download_history;
pub mod file;
pub mod lead;
pub mod project;
pub mod stage;
pub mod user;

pub use brochure::{
    BrochurePage, BrochureProject, BrochureProjectPatch, BrochureStatus, NewBrochurePage,
    NewPageComment, PageAction, PageComment,
};
pub use comment_task::{CommentTask, NewCommentTask, TaskStatus};
pub use download_history::DownloadHistory;
pub use file::{FileCategory, FilePatch, NewFile, ProjectFile};
pub use lead::{Lead, LeadPatch, NewLead};
pub use project::{NewProject, Priority, Project, ProjectPatch, ProjectStatus};
pub use stage::{ApprovalStatus, NewStage, ReviewDecision, Stage};
pub use user::{Role, User};

use serde::Serialize;
use serde_json::Value;

use crate::database::store::Row;

/// Serialize any payload into the JSON object shape the store consumes.
pub fn to_row<T: Serialize + ?Sized>(value: &T) -> Result<Row, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// Partial update for one entity.
pub trait Patch: Serialize {
    /// Field-level checks run before the patch reaches the store.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    fn to_row(&self) -> Result<Row, serde_json::Error> {
        to_row(self)
    }
}

pub(crate) fn check_percentage(field: &str, value: i32) -> Result<(), String> {
    if (0..=100).contains(&value) {
        Ok(())
    } else {
        Err(format!("{} must be between 0 and 100, got {}", field, value))
    }
}
