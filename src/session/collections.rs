use serde::Serialize;

use crate::database::models::{
    BrochurePage, BrochureProject, CommentTask, DownloadHistory, Lead, PageComment, Project,
    ProjectFile, Stage, User,
};
use crate::filter::FilterData;
use crate::types::Table;

/// One of the ten cached collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Projects,
    Stages,
    CommentTasks,
    Files,
    Leads,
    Employees,
    BrochureProjects,
    BrochurePages,
    PageComments,
    DownloadHistory,
}

impl Collection {
    pub const ALL: [Collection; 10] = [
        Collection::Projects,
        Collection::Stages,
        Collection::CommentTasks,
        Collection::Files,
        Collection::Leads,
        Collection::Employees,
        Collection::BrochureProjects,
        Collection::BrochurePages,
        Collection::PageComments,
        Collection::DownloadHistory,
    ];

    pub fn table(&self) -> Table {
        match self {
            Collection::Projects => Table::Projects,
            Collection::Stages => Table::Stages,
            Collection::CommentTasks => Table::CommentTasks,
            Collection::Files => Table::Files,
            Collection::Leads => Table::Leads,
            Collection::Employees => Table::Users,
            Collection::BrochureProjects => Table::BrochureProjects,
            Collection::BrochurePages => Table::BrochurePages,
            Collection::PageComments => Table::PageComments,
            Collection::DownloadHistory => Table::DownloadHistory,
        }
    }

    /// Only managers see leads and the staff directory
    pub fn manager_only(&self) -> bool {
        matches!(self, Collection::Leads | Collection::Employees)
    }

    /// The query each collection is loaded with
    pub fn query(&self) -> FilterData {
        match self {
            Collection::Projects => FilterData::new().with_order("created_at desc"),
            Collection::Stages => FilterData::new().with_order("order asc"),
            Collection::CommentTasks => FilterData::new().with_order("timestamp desc"),
            Collection::Files => FilterData::new()
                .with_where(serde_json::json!({ "is_archived": false }))
                .with_order("timestamp desc"),
            Collection::Leads => FilterData::new().with_order("created_at desc"),
            Collection::Employees => FilterData::new()
                .with_where(serde_json::json!({ "role": { "$in": ["employee", "client"] } }))
                .with_order("name asc"),
            Collection::BrochureProjects => FilterData::new().with_order("created_at desc"),
            Collection::BrochurePages => FilterData::new().with_order("page_number asc"),
            Collection::PageComments => FilterData::new().with_order("timestamp asc"),
            Collection::DownloadHistory => FilterData::new().with_order("download_date desc"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Collections {
    pub projects: Vec<Project>,
    pub stages: Vec<Stage>,
    pub comment_tasks: Vec<CommentTask>,
    pub files: Vec<ProjectFile>,
    pub leads: Vec<Lead>,
    pub employees: Vec<User>,
    pub brochure_projects: Vec<BrochureProject>,
    pub brochure_pages: Vec<BrochurePage>,
    pub page_comments: Vec<PageComment>,
    pub download_history: Vec<DownloadHistory>,
}

/// A freshly fetched collection, ready to be swapped into the cache
#[derive(Debug)]
pub(crate) enum Loaded {
    Projects(Vec<Project>),
    Stages(Vec<Stage>),
    CommentTasks(Vec<CommentTask>),
    Files(Vec<ProjectFile>),
    Leads(Vec<Lead>),
    Employees(Vec<User>),
    BrochureProjects(Vec<BrochureProject>),
    BrochurePages(Vec<BrochurePage>),
    PageComments(Vec<PageComment>),
    DownloadHistory(Vec<DownloadHistory>),
}

impl Collections {
    pub(crate) fn install(&mut self, loaded: Loaded) {
        match loaded {
            Loaded::Projects(rows) => self.projects = rows,
            Loaded::Stages(rows) => self.stages = rows,
            Loaded::CommentTasks(rows) => self.comment_tasks = rows,
            Loaded::Files(rows) => self.files = rows,
            Loaded::Leads(rows) => self.leads = rows,
            Loaded::Employees(rows) => self.employees = rows,
            Loaded::BrochureProjects(rows) => self.brochure_projects = rows,
            Loaded::BrochurePages(rows) => self.brochure_pages = rows,
            Loaded::PageComments(rows) => self.page_comments = rows,
            Loaded::DownloadHistory(rows) => self.download_history = rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
            && self.stages.is_empty()
            && self.comment_tasks.is_empty()
            && self.files.is_empty()
            && self.leads.is_empty()
            && self.employees.is_empty()
            && self.brochure_projects.is_empty()
            && self.brochure_pages.is_empty()
            && self.page_comments.is_empty()
            && self.download_history.is_empty()
    }
}

/// Everything a view renders from: the collections plus the loading flag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSnapshot {
    #[serde(flatten)]
    pub collections: Collections,
    pub loading: bool,
}
