use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::{FilePatch, NewFile, Patch};
use crate::database::{by_id, Changes, Mutation, Row};
use crate::types::Table;

use super::data_session::validation;
use super::{Collection, DataError, DataSession};

impl DataSession {
    /// Record an uploaded file; the uploader is the signed-in identity.
    pub async fn upload_file(&self, file: NewFile) -> Result<(), DataError> {
        validation(file.validate())?;
        let mut row = self.stamped(&file, "uploaded_by")?;
        row.insert("uploader_name".to_string(), Value::String(self.identity().name.clone()));
        self.store().insert(Table::Files, vec![row]).await?;
        self.reload(&[Collection::Files]).await
    }

    /// Count a download and append it to the audit trail in one batch. The
    /// store increments the counter, so concurrent downloads all count.
    pub async fn download_file(&self, file_id: Uuid) -> Result<(), DataError> {
        let (file_name, file_size) = self
            .collections()
            .await
            .files
            .iter()
            .find(|f| f.id == file_id)
            .map(|f| (f.filename.clone(), f.size))
            .ok_or_else(|| DataError::not_found("file", file_id))?;

        let identity = self.identity();
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let changes = Changes::set(Row::new())
            .with("last_downloaded", now)
            .with("last_downloaded_by", identity.id.to_string())
            .with_increment("download_count", 1);

        let mut history = Row::new();
        history.insert("file_id".to_string(), json!(file_id));
        history.insert("downloaded_by".to_string(), json!(identity.id));
        history.insert("downloader_name".to_string(), json!(identity.name));
        history.insert("file_name".to_string(), json!(file_name));
        history.insert("file_size".to_string(), json!(file_size));

        self.apply(vec![
            Mutation::Update { table: Table::Files, filter: by_id(file_id), changes, require_match: true },
            Mutation::Insert { table: Table::DownloadHistory, row: history },
        ])
        .await?;
        self.reload(&[Collection::Files, Collection::DownloadHistory]).await
    }

    pub async fn update_file_metadata(&self, file_id: Uuid, patch: FilePatch) -> Result<(), DataError> {
        validation(patch.validate())?;
        let changes = Changes::set(patch.to_row()?);
        self.update_one(Table::Files, "file", file_id, changes).await?;
        self.reload(&[Collection::Files]).await
    }
}
