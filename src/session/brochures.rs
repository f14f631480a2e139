use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::models::{
    to_row, ApprovalStatus, BrochurePage, BrochureProject, BrochureProjectPatch, NewBrochurePage, NewPageComment,
    PageAction, Patch, ReviewDecision,
};
use crate::database::{by_id, Changes, DatabaseError, Mutation, Row};
use crate::filter::FilterData;
use crate::types::Table;

use super::data_session::{decode_rows, validation};
use super::{Collection, DataError, DataSession};

const PAGE_CONFLICT: [&str; 2] = ["project_id", "page_number"];

impl DataSession {
    /// Start a brochure for a client; returns the new brochure project's id.
    pub async fn create_brochure_project(&self, client_id: Uuid, client_name: &str) -> Result<Uuid, DataError> {
        let mut row = Row::new();
        row.insert("client_id".to_string(), json!(client_id));
        row.insert("client_name".to_string(), json!(client_name));

        let inserted = self.store().insert(Table::BrochureProjects, vec![row]).await?;
        let project = decode_rows::<BrochureProject>(inserted)?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::QueryError("insert returned no row".to_string()))?;

        self.reload(&[Collection::BrochureProjects]).await?;
        Ok(project.id)
    }

    pub async fn update_brochure_project(&self, id: Uuid, patch: BrochureProjectPatch) -> Result<(), DataError> {
        validation(patch.validate())?;
        let changes = Changes::set(patch.to_row()?);
        self.update_one(Table::BrochureProjects, "brochure project", id, changes).await?;
        self.reload(&[Collection::BrochureProjects]).await
    }

    /// Create or overwrite the page at `(project_id, page_number)`. A page
    /// locked by someone else is refused.
    pub async fn save_brochure_page(&self, page: NewBrochurePage) -> Result<(), DataError> {
        validation(page.validate())?;

        let me = self.identity().id;
        let locked = self
            .collections()
            .await
            .brochure_pages
            .iter()
            .find(|p| p.project_id == page.project_id && p.page_number == page.page_number && p.locked_by_other(me))
            .map(|p| (p.id, holder_name(p)));
        if let Some((page_id, holder)) = locked {
            return Err(DataError::PageLocked { page_id, holder });
        }

        self.store()
            .upsert(Table::BrochurePages, vec![to_row(&page)?], &PAGE_CONFLICT)
            .await?;
        self.reload(&[Collection::BrochurePages]).await
    }

    pub async fn add_page_comment(&self, comment: NewPageComment) -> Result<(), DataError> {
        if comment.text.trim().is_empty() {
            return Err(DataError::Validation("comment text cannot be empty".to_string()));
        }
        let row = self.authored(to_row(&comment)?);
        self.store().insert(Table::PageComments, vec![row]).await?;
        self.reload(&[Collection::PageComments]).await
    }

    /// Review a page. With a comment, the decision and an approval comment
    /// are written atomically.
    pub async fn approve_brochure_page(
        &self,
        page_id: Uuid,
        decision: ReviewDecision,
        comment: Option<String>,
    ) -> Result<(), DataError> {
        let status: ApprovalStatus = decision.into();
        let changes = Changes::set(Row::new()).with("approval_status", serde_json::to_value(status)?);

        let comment = comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        let Some(comment) = comment else {
            self.update_one(Table::BrochurePages, "brochure page", page_id, changes).await?;
            return self.reload(&[Collection::BrochurePages]).await;
        };

        let mut note = NewPageComment::new(page_id, approval_text(decision, &self.identity().name, &comment));
        note.action_type = Some(PageAction::Approval);

        self.apply(vec![
            Mutation::Update { table: Table::BrochurePages, filter: by_id(page_id), changes, require_match: true },
            Mutation::Insert { table: Table::PageComments, row: self.authored(to_row(&note)?) },
        ])
        .await?;
        self.reload(&[Collection::BrochurePages, Collection::PageComments]).await
    }

    /// Take the edit lock on a page. Succeeds only if the page is unlocked
    /// at the moment of the write.
    pub async fn lock_brochure_page(&self, page_id: Uuid) -> Result<(), DataError> {
        let identity = self.identity();
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let changes = Changes::set(Row::new())
            .with("is_locked", true)
            .with("locked_by", identity.id.to_string())
            .with("locked_by_name", identity.name.clone())
            .with("locked_at", now);

        let filter = json!({ "id": page_id, "is_locked": false });
        let affected = self.store().update(Table::BrochurePages, filter, changes).await?;
        if affected == 0 {
            return Err(self.lock_refused(page_id).await);
        }

        info!(page = %page_id, user = %identity.id, "locked brochure page");
        self.reload(&[Collection::BrochurePages]).await
    }

    /// Release the edit lock. Managers may release any lock; everyone else
    /// only their own.
    pub async fn unlock_brochure_page(&self, page_id: Uuid) -> Result<(), DataError> {
        let identity = self.identity();
        let filter = if identity.is_manager() {
            by_id(page_id)
        } else {
            json!({
                "id": page_id,
                "$or": [ { "locked_by": identity.id }, { "is_locked": false } ]
            })
        };
        let changes = Changes::set(Row::new())
            .with("is_locked", false)
            .with("locked_by", Value::Null)
            .with("locked_by_name", Value::Null)
            .with("locked_at", Value::Null);

        let affected = self.store().update(Table::BrochurePages, filter, changes).await?;
        if affected == 0 {
            return Err(self.lock_refused(page_id).await);
        }

        info!(page = %page_id, user = %identity.id, "unlocked brochure page");
        self.reload(&[Collection::BrochurePages]).await
    }

    /// Work out why a lock write matched nothing: the page is gone, or
    /// someone else holds it.
    async fn lock_refused(&self, page_id: Uuid) -> DataError {
        let query = FilterData::new().with_where(by_id(page_id)).with_limit(1);
        let current = match self.store().select(Table::BrochurePages, query).await {
            Ok(rows) => decode_rows::<BrochurePage>(rows),
            Err(e) => return e.into(),
        };
        match current.map(|pages| pages.into_iter().next()) {
            Ok(Some(page)) => {
                let holder = holder_name(&page);
                warn!(page = %page_id, holder = %holder, user = %self.identity().id, "brochure page lock refused");
                DataError::PageLocked { page_id, holder }
            }
            Ok(None) => DataError::not_found("brochure page", page_id),
            Err(e) => e,
        }
    }
}

fn holder_name(page: &BrochurePage) -> String {
    page.locked_by_name
        .clone()
        .or_else(|| page.locked_by.map(|id| id.to_string()))
        .unwrap_or_else(|| "another user".to_string())
}

fn approval_text(decision: ReviewDecision, reviewer: &str, comment: &str) -> String {
    let reviewer = if reviewer.is_empty() { "Manager" } else { reviewer };
    match decision {
        ReviewDecision::Approved => format!("Page has been approved by {}: {}", reviewer, comment),
        ReviewDecision::Rejected => format!("Page requires changes - {}: {}", reviewer, comment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_text_names_the_reviewer() {
        assert_eq!(
            approval_text(ReviewDecision::Approved, "Maya", "looks great"),
            "Page has been approved by Maya: looks great"
        );
        assert_eq!(
            approval_text(ReviewDecision::Rejected, "", "fix the logo"),
            "Page requires changes - Manager: fix the logo"
        );
    }
}
