/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// The ten tables mirrored by a data session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Users,
    Projects,
    Stages,
    CommentTasks,
    Files,
    Leads,
    BrochureProjects,
    BrochurePages,
    PageComments,
    DownloadHistory,
}

impl Table {
    pub const ALL: [Table; 10] = [
        Table::Users,
        Table::Projects,
        Table::Stages,
        Table::CommentTasks,
        Table::Files,
        Table::Leads,
        Table::BrochureProjects,
        Table::BrochurePages,
        Table::PageComments,
        Table::DownloadHistory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Projects => "projects",
            Table::Stages => "stages",
            Table::CommentTasks => "comment_tasks",
            Table::Files => "files",
            Table::Leads => "leads",
            Table::BrochureProjects => "brochure_projects",
            Table::BrochurePages => "brochure_pages",
            Table::PageComments => "page_comments",
            Table::DownloadHistory => "download_history",
        }
    }

    pub fn parse(name: &str) -> Option<Table> {
        Self::ALL.iter().copied().find(|t| t.as_str() == name)
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serde helper for patch fields that may be explicitly set to null.
///
/// Combined with `#[serde(default, skip_serializing_if = "Option::is_none")]`:
/// a missing key stays `None` (unchanged), `null` becomes `Some(None)` (cleared).
pub mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_round_trip() {
        for table in Table::ALL {
            assert_eq!(Table::parse(table.as_str()), Some(table));
        }
        assert_eq!(Table::parse("tenants"), None);
    }
}
