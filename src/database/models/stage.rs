use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// Outcome of a review; the only values an approval command accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl From<ReviewDecision> for ApprovalStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approved => ApprovalStatus::Approved,
            ReviewDecision::Rejected => ApprovalStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub notes: String,
    pub progress_percentage: i32,
    pub approval_status: ApprovalStatus,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStage {
    pub project_id: Uuid,
    pub name: String,
    pub order: i32,
    pub notes: String,
    pub progress_percentage: i32,
    pub approval_status: ApprovalStatus,
}

/// Lifecycle every new project starts with, in order.
pub const DEFAULT_STAGES: [&str; 5] = ["Planning", "Design", "Development", "QC", "Launch"];

impl NewStage {
    /// The five pending, empty stages provisioned alongside a new project.
    pub fn defaults_for(project_id: Uuid) -> Vec<NewStage> {
        DEFAULT_STAGES
            .iter()
            .enumerate()
            .map(|(order, name)| NewStage {
                project_id,
                name: name.to_string(),
                order: order as i32,
                notes: String::new(),
                progress_percentage: 0,
                approval_status: ApprovalStatus::Pending,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stages_are_ordered_and_pending() {
        let project_id = Uuid::new_v4();
        let stages = NewStage::defaults_for(project_id);
        let names: Vec<_> = stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Planning", "Design", "Development", "QC", "Launch"]);
        for (i, stage) in stages.iter().enumerate() {
            assert_eq!(stage.order, i as i32);
            assert_eq!(stage.approval_status, ApprovalStatus::Pending);
            assert_eq!(stage.project_id, project_id);
        }
    }
}
