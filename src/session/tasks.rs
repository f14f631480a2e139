use uuid::Uuid;

use crate::database::models::{to_row, NewCommentTask, TaskStatus};
use crate::database::Changes;
use crate::types::Table;

use super::{Collection, DataError, DataSession};

impl DataSession {
    pub async fn add_comment_task(&self, task: NewCommentTask) -> Result<(), DataError> {
        if task.text.trim().is_empty() {
            return Err(DataError::Validation("comment text cannot be empty".to_string()));
        }
        let row = self.authored(to_row(&task)?);
        self.store().insert(Table::CommentTasks, vec![row]).await?;
        self.reload(&[Collection::CommentTasks]).await
    }

    pub async fn update_comment_task_status(&self, id: Uuid, status: TaskStatus) -> Result<(), DataError> {
        let changes = Changes::default().with("status", serde_json::to_value(status)?);
        self.update_one(Table::CommentTasks, "comment task", id, changes).await?;
        self.reload(&[Collection::CommentTasks]).await
    }
}
