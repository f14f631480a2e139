//! The per-identity data session: ten cached collections, the commands that
//! write through to the store, and pure read-helpers over the cache.

pub mod collections;
pub mod context;
pub mod data_session;
pub mod helpers;

mod brochures;
mod files;
mod leads;
mod projects;
mod tasks;

use thiserror::Error;
use uuid::Uuid;

use crate::database::DatabaseError;

pub use collections::{Collection, Collections, DataSnapshot};
pub use context::DataContext;
pub use data_session::DataSession;
pub use helpers::{EmployeeWorkload, ProjectQuery};

#[derive(Debug, Error)]
pub enum DataError {
    #[error(transparent)]
    Store(#[from] DatabaseError),

    #[error("No authenticated identity")]
    NotAuthenticated,

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Page {page_id} is locked by {holder}")]
    PageLocked { page_id: Uuid, holder: String },

    #[error("Failed to decode row: {0}")]
    Decode(#[from] serde_json::Error),
}

impl DataError {
    pub(crate) fn not_found(entity: &'static str, id: Uuid) -> Self {
        DataError::NotFound { entity, id }
    }
}
