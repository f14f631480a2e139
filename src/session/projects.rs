use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::database::models::{
    check_percentage, to_row, ApprovalStatus, NewCommentTask, NewProject, NewStage, Patch, ProjectPatch, ReviewDecision,
};
use crate::database::{by_id, Changes, Mutation, Row};
use crate::types::Table;

use super::data_session::validation;
use super::{Collection, DataError, DataSession};

impl DataSession {
    /// Create a project together with its five default stages, then reload
    /// everything. Returns the new project's id.
    pub async fn create_project(&self, project: NewProject) -> Result<Uuid, DataError> {
        validation(project.validate())?;

        let id = Uuid::new_v4();
        let mut row = to_row(&project)?;
        row.insert("id".to_string(), Value::String(id.to_string()));

        let mut mutations = vec![Mutation::Insert { table: Table::Projects, row }];
        for stage in NewStage::defaults_for(id) {
            mutations.push(Mutation::Insert { table: Table::Stages, row: to_row(&stage)? });
        }
        self.apply(mutations).await?;

        info!(project = %id, title = %project.title, "created project");
        self.refresh_data().await?;
        Ok(id)
    }

    pub async fn update_project(&self, id: Uuid, patch: ProjectPatch) -> Result<(), DataError> {
        validation(patch.validate())?;
        let changes = Changes::set(patch.to_row()?);
        self.update_one(Table::Projects, "project", id, changes).await?;
        self.reload(&[Collection::Projects]).await
    }

    /// Delete a project; its stages, tasks and files go with it.
    pub async fn delete_project(&self, id: Uuid) -> Result<(), DataError> {
        self.delete_one(Table::Projects, "project", id).await?;
        info!(project = %id, "deleted project");
        self.refresh_data().await
    }

    pub async fn update_stage_progress(&self, stage_id: Uuid, progress: i32) -> Result<(), DataError> {
        validation(check_percentage("progress_percentage", progress))?;
        let changes = Changes::default().with("progress_percentage", progress);
        self.update_one(Table::Stages, "stage", stage_id, changes).await?;
        self.reload(&[Collection::Stages]).await
    }

    /// Record a review decision on a stage. With a comment, the decision and
    /// a comment task authored by the reviewer are written atomically.
    pub async fn update_stage_approval(
        &self,
        stage_id: Uuid,
        decision: ReviewDecision,
        comment: Option<String>,
    ) -> Result<(), DataError> {
        let status: ApprovalStatus = decision.into();
        let changes = Changes::set(Row::new()).with("approval_status", serde_json::to_value(status)?);

        let comment = comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        let Some(text) = comment else {
            self.update_one(Table::Stages, "stage", stage_id, changes).await?;
            return self.reload(&[Collection::Stages]).await;
        };

        let project_id = self
            .collections()
            .await
            .stages
            .iter()
            .find(|s| s.id == stage_id)
            .map(|s| s.project_id)
            .ok_or_else(|| DataError::not_found("stage", stage_id))?;

        let task = NewCommentTask::new(project_id, text).on_stage(stage_id);
        self.apply(vec![
            Mutation::Update { table: Table::Stages, filter: by_id(stage_id), changes, require_match: true },
            Mutation::Insert { table: Table::CommentTasks, row: self.authored(to_row(&task)?) },
        ])
        .await?;
        self.reload(&[Collection::Stages, Collection::CommentTasks]).await
    }
}
