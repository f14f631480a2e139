//! Derived views over the cached collections. Everything here is pure: the
//! `Collections` methods read a snapshot and never touch the store, and the
//! `DataSession` wrappers only take the cache read lock.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Identity;
use crate::database::models::{
    BrochurePage, BrochureProject, CommentTask, DownloadHistory, PageComment, Priority, Project, ProjectStatus, Role,
    Stage,
};

use super::collections::Collections;
use super::DataSession;

/// Manager dashboard filter; `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    pub employee: Option<Uuid>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeWorkload {
    pub employee_id: Uuid,
    pub name: String,
    pub project_count: usize,
    /// Mean progress of assigned projects, rounded; 0 with no projects
    pub average_progress: i32,
}

impl Collections {
    /// Pages of one brochure, ascending by page number
    pub fn brochure_pages_for(&self, project_id: Uuid) -> Vec<BrochurePage> {
        let mut pages: Vec<BrochurePage> =
            self.brochure_pages.iter().filter(|p| p.project_id == project_id).cloned().collect();
        pages.sort_by_key(|p| p.page_number);
        pages
    }

    /// Comments on one page, oldest first; equal timestamps keep cache order
    pub fn page_comments_for(&self, page_id: Uuid) -> Vec<PageComment> {
        let mut comments: Vec<PageComment> =
            self.page_comments.iter().filter(|c| c.page_id == page_id).cloned().collect();
        comments.sort_by_key(|c| c.timestamp);
        comments
    }

    pub fn stages_for(&self, project_id: Uuid) -> Vec<Stage> {
        let mut stages: Vec<Stage> = self.stages.iter().filter(|s| s.project_id == project_id).cloned().collect();
        stages.sort_by_key(|s| s.order);
        stages
    }

    pub fn comment_tasks_for(&self, project_id: Uuid, stage_id: Option<Uuid>) -> Vec<CommentTask> {
        self.comment_tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .filter(|t| stage_id.is_none() || t.stage_id == stage_id)
            .cloned()
            .collect()
    }

    pub fn download_history_for(&self, file_id: Option<Uuid>) -> Vec<DownloadHistory> {
        self.download_history
            .iter()
            .filter(|h| file_id.map_or(true, |id| h.file_id == id))
            .cloned()
            .collect()
    }

    pub fn brochure_projects_for_review(&self) -> Vec<BrochureProject> {
        self.brochure_projects.iter().filter(|p| p.status.awaiting_review()).cloned().collect()
    }

    pub fn filter_projects(&self, query: &ProjectQuery) -> Vec<Project> {
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        self.projects
            .iter()
            .filter(|p| {
                needle.as_ref().map_or(true, |n| {
                    p.title.to_lowercase().contains(n)
                        || p.client_name.to_lowercase().contains(n)
                        || p.description.to_lowercase().contains(n)
                })
            })
            .filter(|p| query.status.map_or(true, |s| p.status == s))
            .filter(|p| query.priority.map_or(true, |pr| p.priority == pr))
            .filter(|p| query.employee.map_or(true, |e| p.assigned_employees.contains(&e)))
            .cloned()
            .collect()
    }

    /// Projects a dashboard shows to `identity`: everything for managers,
    /// assigned projects for employees, owned projects for clients.
    pub fn projects_for(&self, identity: &Identity) -> Vec<Project> {
        self.projects
            .iter()
            .filter(|p| match identity.role {
                Role::Manager => true,
                Role::Employee => p.assigned_employees.contains(&identity.id),
                Role::Client => p.client_id == identity.id,
            })
            .cloned()
            .collect()
    }

    pub fn employee_workload(&self) -> Vec<EmployeeWorkload> {
        self.employees
            .iter()
            .filter(|u| u.role == Role::Employee)
            .map(|employee| {
                let progress: Vec<i32> = self
                    .projects
                    .iter()
                    .filter(|p| p.assigned_employees.contains(&employee.id))
                    .map(|p| p.progress_percentage)
                    .collect();
                let average_progress = if progress.is_empty() {
                    0
                } else {
                    let total: i64 = progress.iter().map(|v| i64::from(*v)).sum();
                    (total as f64 / progress.len() as f64).round() as i32
                };
                EmployeeWorkload {
                    employee_id: employee.id,
                    name: employee.name.clone(),
                    project_count: progress.len(),
                    average_progress,
                }
            })
            .collect()
    }
}

impl DataSession {
    pub async fn get_brochure_pages(&self, project_id: Uuid) -> Vec<BrochurePage> {
        self.collections().await.brochure_pages_for(project_id)
    }

    pub async fn get_page_comments(&self, page_id: Uuid) -> Vec<PageComment> {
        self.collections().await.page_comments_for(page_id)
    }

    pub async fn get_stages(&self, project_id: Uuid) -> Vec<Stage> {
        self.collections().await.stages_for(project_id)
    }

    pub async fn get_comment_tasks(&self, project_id: Uuid, stage_id: Option<Uuid>) -> Vec<CommentTask> {
        self.collections().await.comment_tasks_for(project_id, stage_id)
    }

    pub async fn get_download_history(&self, file_id: Option<Uuid>) -> Vec<DownloadHistory> {
        self.collections().await.download_history_for(file_id)
    }

    pub async fn get_brochure_projects_for_review(&self) -> Vec<BrochureProject> {
        self.collections().await.brochure_projects_for_review()
    }

    pub async fn filter_projects(&self, query: &ProjectQuery) -> Vec<Project> {
        self.collections().await.filter_projects(query)
    }

    pub async fn my_projects(&self) -> Vec<Project> {
        self.collections().await.projects_for(self.identity())
    }

    pub async fn employee_workload(&self) -> Vec<EmployeeWorkload> {
        self.collections().await.employee_workload()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::json;

    use crate::database::models::{ApprovalStatus, BrochureStatus, User};

    fn ts(seconds: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    fn page(project_id: Uuid, number: i32) -> BrochurePage {
        BrochurePage {
            id: Uuid::new_v4(),
            project_id,
            page_number: number,
            approval_status: ApprovalStatus::Pending,
            is_locked: false,
            locked_by: None,
            locked_by_name: None,
            locked_at: None,
            content: json!({}),
            created_at: ts(0),
            updated_at: ts(0),
        }
    }

    fn comment(page_id: Uuid, text: &str, at: i64) -> PageComment {
        PageComment {
            id: Uuid::new_v4(),
            page_id,
            text: text.to_string(),
            added_by: Uuid::new_v4(),
            author_name: "Riya".to_string(),
            author_role: Role::Client,
            timestamp: ts(at),
            marked_done: false,
            action_type: None,
        }
    }

    fn project(title: &str, progress: i32, employees: Vec<Uuid>) -> Project {
        Project {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: String::new(),
            client_id: Uuid::new_v4(),
            client_name: "Northwind".to_string(),
            deadline: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            progress_percentage: progress,
            assigned_employees: employees,
            created_at: ts(0),
            updated_at: ts(0),
            status: ProjectStatus::Active,
            priority: Priority::Medium,
        }
    }

    fn user(name: &str, role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            role,
            created_at: ts(0),
            updated_at: ts(0),
        }
    }

    #[test]
    fn brochure_pages_sorted_and_scoped() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let cache = Collections {
            brochure_pages: vec![page(a, 3), page(b, 1), page(a, 1), page(a, 2)],
            ..Default::default()
        };
        let numbers: Vec<i32> = cache.brochure_pages_for(a).iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn page_comments_oldest_first_and_stable() {
        let pg = Uuid::new_v4();
        let cache = Collections {
            page_comments: vec![
                comment(pg, "late", 20),
                comment(pg, "tie-first", 10),
                comment(Uuid::new_v4(), "other page", 5),
                comment(pg, "tie-second", 10),
            ],
            ..Default::default()
        };
        let texts: Vec<String> = cache.page_comments_for(pg).into_iter().map(|c| c.text).collect();
        assert_eq!(texts, vec!["tie-first", "tie-second", "late"]);
    }

    #[test]
    fn filter_projects_combines_criteria() {
        let dev = Uuid::new_v4();
        let mut urgent = project("Site Redesign", 40, vec![dev]);
        urgent.priority = Priority::High;
        let cache = Collections {
            projects: vec![urgent.clone(), project("Brand Refresh", 10, vec![])],
            ..Default::default()
        };

        let by_search = cache.filter_projects(&ProjectQuery { search: Some("redesign".into()), ..Default::default() });
        assert_eq!(by_search, vec![urgent.clone()]);

        let by_employee = cache.filter_projects(&ProjectQuery {
            employee: Some(dev),
            priority: Some(Priority::High),
            ..Default::default()
        });
        assert_eq!(by_employee.len(), 1);

        assert_eq!(cache.filter_projects(&ProjectQuery::default()).len(), 2);
    }

    #[test]
    fn workload_rounds_average_progress() {
        let ana = user("Ana", Role::Employee);
        let idle = user("Idle", Role::Employee);
        let client = user("Client", Role::Client);
        let cache = Collections {
            employees: vec![ana.clone(), client, idle.clone()],
            projects: vec![project("A", 50, vec![ana.id]), project("B", 25, vec![ana.id])],
            ..Default::default()
        };

        let workload = cache.employee_workload();
        assert_eq!(workload.len(), 2);
        assert_eq!(workload[0].employee_id, ana.id);
        assert_eq!(workload[0].project_count, 2);
        assert_eq!(workload[0].average_progress, 38);
        assert_eq!(workload[1].average_progress, 0);
    }

    #[test]
    fn projects_scoped_by_role() {
        let dev = Identity::new(Uuid::new_v4(), "Dev", Role::Employee);
        let owned = project("Owned", 0, vec![]);
        let client = Identity::new(owned.client_id, "Owner", Role::Client);
        let cache = Collections {
            projects: vec![owned.clone(), project("Assigned", 0, vec![dev.id])],
            ..Default::default()
        };
        assert_eq!(cache.projects_for(&client), vec![owned]);
        assert_eq!(cache.projects_for(&dev)[0].title, "Assigned");
        let manager = Identity::new(Uuid::new_v4(), "Boss", Role::Manager);
        assert_eq!(cache.projects_for(&manager).len(), 2);
    }

    #[test]
    fn review_queue_holds_design_statuses() {
        let mk = |status| BrochureProject {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            client_name: "c".to_string(),
            status,
            created_at: ts(0),
            updated_at: ts(0),
        };
        let cache = Collections {
            brochure_projects: vec![
                mk(BrochureStatus::Draft),
                mk(BrochureStatus::ReadyForDesign),
                mk(BrochureStatus::InDesign),
                mk(BrochureStatus::Completed),
            ],
            ..Default::default()
        };
        assert_eq!(cache.brochure_projects_for_review().len(), 2);
    }
}
