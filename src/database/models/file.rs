use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Patch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Reference,
    Content,
    Assets,
    Requirements,
    Other,
}

/// Metadata for an uploaded file. The bytes live behind `file_url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub id: Uuid,
    pub stage_id: Option<Uuid>,
    pub project_id: Uuid,
    pub filename: String,
    pub file_url: String,
    pub uploaded_by: Uuid,
    pub uploader_name: String,
    pub timestamp: DateTime<Utc>,
    pub size: i64,
    pub file_type: String,
    pub category: FileCategory,
    pub description: Option<String>,
    pub download_count: i64,
    pub last_downloaded: Option<DateTime<Utc>>,
    pub last_downloaded_by: Option<Uuid>,
    pub is_archived: bool,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFile {
    pub project_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<Uuid>,
    pub filename: String,
    pub file_url: String,
    pub size: i64,
    pub file_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<FileCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewFile {
    pub fn validate(&self) -> Result<(), String> {
        if self.filename.trim().is_empty() {
            return Err("filename cannot be empty".to_string());
        }
        if self.size < 0 {
            return Err(format!("size cannot be negative, got {}", self.size));
        }
        Ok(())
    }
}

/// Editable file metadata. Download accounting is deliberately absent:
/// only `download_file` moves those columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilePatch {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::types::double_option"
    )]
    pub stage_id: Option<Option<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<FileCategory>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::types::double_option"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Patch for FilePatch {
    fn validate(&self) -> Result<(), String> {
        if let Some(filename) = &self.filename {
            if filename.trim().is_empty() {
                return Err("filename cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn explicit_null_clears_and_absent_keeps() {
        let patch: FilePatch = serde_json::from_value(json!({ "description": null })).unwrap();
        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.stage_id, None);

        let row = patch.to_row().unwrap();
        assert_eq!(row.len(), 1);
        assert_eq!(row["description"], json!(null));
    }

    #[test]
    fn download_counter_cannot_be_patched() {
        let patch: FilePatch =
            serde_json::from_value(json!({ "download_count": 99, "is_archived": true })).unwrap();
        let row = patch.to_row().unwrap();
        assert!(!row.contains_key("download_count"));
        assert_eq!(row["is_archived"], json!(true));
    }
}
