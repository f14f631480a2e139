use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row per download; never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadHistory {
    pub id: Uuid,
    pub file_id: Uuid,
    pub downloaded_by: Uuid,
    pub downloader_name: String,
    pub download_date: DateTime<Utc>,
    pub file_name: String,
    pub file_size: i64,
}
