//! Column defaults and relationships of the dashboard tables, mirrored from
//! `sql/schema.sql` for stores that do not run Postgres.

use serde_json::{json, Value};

use crate::types::Table;

/// Columns filled with the current time when an insert omits them
pub fn timestamp_columns(table: Table) -> &'static [&'static str] {
    match table {
        Table::CommentTasks | Table::Files | Table::PageComments => &["timestamp"],
        Table::DownloadHistory => &["download_date"],
        _ => &["created_at", "updated_at"],
    }
}

/// Whether writes to the table refresh `updated_at`
pub fn has_updated_at(table: Table) -> bool {
    timestamp_columns(table).contains(&"updated_at")
}

/// Non-timestamp column defaults applied on insert
pub fn defaults(table: Table) -> Vec<(&'static str, Value)> {
    match table {
        Table::Users => vec![("role", json!("client"))],
        Table::Projects => vec![
            ("description", json!("")),
            ("client_name", json!("")),
            ("progress_percentage", json!(0)),
            ("assigned_employees", json!([])),
            ("status", json!("active")),
            ("priority", json!("medium")),
        ],
        Table::Stages => vec![
            ("notes", json!("")),
            ("progress_percentage", json!(0)),
            ("approval_status", json!("pending")),
            ("order", json!(0)),
        ],
        Table::CommentTasks => vec![
            ("stage_id", Value::Null),
            ("status", json!("open")),
            ("assigned_to", Value::Null),
            ("deadline", Value::Null),
            ("is_global", json!(false)),
        ],
        Table::Files => vec![
            ("stage_id", Value::Null),
            ("size", json!(0)),
            ("file_type", json!("")),
            ("category", json!("other")),
            ("description", Value::Null),
            ("download_count", json!(0)),
            ("last_downloaded", Value::Null),
            ("last_downloaded_by", Value::Null),
            ("is_archived", json!(false)),
            ("tags", json!([])),
        ],
        Table::Leads => vec![
            ("contact_info", json!("")),
            ("estimated_amount", json!(0)),
            ("notes", json!("")),
        ],
        Table::BrochureProjects => vec![("client_name", json!("")), ("status", json!("draft"))],
        Table::BrochurePages => vec![
            ("approval_status", json!("pending")),
            ("is_locked", json!(false)),
            ("locked_by", Value::Null),
            ("locked_by_name", Value::Null),
            ("locked_at", Value::Null),
            ("content", json!({})),
        ],
        Table::PageComments => vec![("marked_done", json!(false)), ("action_type", json!("comment"))],
        Table::DownloadHistory => vec![
            ("downloader_name", json!("")),
            ("file_name", json!("")),
            ("file_size", json!(0)),
        ],
    }
}

/// Column sets that must be unique besides `id`
pub fn unique_keys(table: Table) -> &'static [&'static [&'static str]] {
    match table {
        Table::Users => &[&["email"]],
        Table::BrochurePages => &[&["project_id", "page_number"]],
        _ => &[],
    }
}

/// Child rows removed along with a parent: `(child table, foreign key)`
pub fn cascades(table: Table) -> &'static [(Table, &'static str)] {
    match table {
        Table::Projects => &[
            (Table::Stages, "project_id"),
            (Table::CommentTasks, "project_id"),
            (Table::Files, "project_id"),
        ],
        Table::Files => &[(Table::DownloadHistory, "file_id")],
        Table::BrochureProjects => &[(Table::BrochurePages, "project_id")],
        Table::BrochurePages => &[(Table::PageComments, "page_id")],
        _ => &[],
    }
}

/// Nullable references cleared when the parent goes away: `(child table, foreign key)`
pub fn set_null_on_delete(table: Table) -> &'static [(Table, &'static str)] {
    match table {
        Table::Stages => &[(Table::CommentTasks, "stage_id"), (Table::Files, "stage_id")],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updated_at_follows_timestamp_columns() {
        assert!(has_updated_at(Table::Projects));
        assert!(has_updated_at(Table::BrochurePages));
        assert!(!has_updated_at(Table::Files));
        assert!(!has_updated_at(Table::DownloadHistory));
    }

    #[test]
    fn project_delete_reaches_download_history() {
        let children: Vec<Table> = cascades(Table::Projects).iter().map(|(t, _)| *t).collect();
        assert!(children.contains(&Table::Files));
        assert_eq!(cascades(Table::Files), &[(Table::DownloadHistory, "file_id")]);
    }
}
