use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::Identity;
use crate::database::models::to_row;
use crate::database::{by_id, Changes, Mutation, MutationOutcome, RemoteStore, Row};
use crate::types::Table;

use super::collections::{Collection, Collections, DataSnapshot, Loaded};
use super::DataError;

/// Session-scoped cache over the remote store for one signed-in identity.
///
/// Commands take `&self`: each performs its write, then reloads the
/// collections it touched and swaps them into the cache. A failed command
/// leaves the cache as it was.
///
/// Every reload takes a ticket before it fetches. A collection is only
/// installed if no reload with a later ticket has installed it already, so
/// overlapping commands cannot leave an older fetch in the cache.
pub struct DataSession {
    store: Arc<dyn RemoteStore>,
    identity: Identity,
    cache: RwLock<Collections>,
    loading: AtomicBool,
    tickets: AtomicU64,
    installed: std::sync::Mutex<HashMap<Collection, u64>>,
}

impl DataSession {
    /// Open an empty session; call [`DataSession::refresh_data`] to populate it.
    pub fn open(store: Arc<dyn RemoteStore>, identity: Identity) -> Self {
        info!(user = %identity.id, role = %identity.role, backend = store.backend(), "opening data session");
        Self {
            store,
            identity,
            cache: RwLock::new(Collections::default()),
            loading: AtomicBool::new(false),
            tickets: AtomicU64::new(0),
            installed: std::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub(crate) fn store(&self) -> &dyn RemoteStore {
        self.store.as_ref()
    }

    /// Read access to the cached collections
    pub async fn collections(&self) -> RwLockReadGuard<'_, Collections> {
        self.cache.read().await
    }

    pub async fn snapshot(&self) -> DataSnapshot {
        DataSnapshot {
            collections: self.cache.read().await.clone(),
            loading: self.is_loading(),
        }
    }

    /// Reload all ten collections concurrently. The new collections replace
    /// the cache together, and only if every fetch succeeded.
    pub async fn refresh_data(&self) -> Result<(), DataError> {
        self.loading.store(true, Ordering::SeqCst);
        let result = self.reload(&Collection::ALL).await;
        self.loading.store(false, Ordering::SeqCst);

        if result.is_ok() {
            let cache = self.cache.read().await;
            info!(
                user = %self.identity.id,
                projects = cache.projects.len(),
                stages = cache.stages.len(),
                files = cache.files.len(),
                brochure_pages = cache.brochure_pages.len(),
                "refreshed data session"
            );
        }
        result
    }

    /// Fetch the given collections and install them in one cache write
    pub(crate) async fn reload(&self, collections: &[Collection]) -> Result<(), DataError> {
        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        let loaded = try_join_all(collections.iter().map(|c| self.load(*c))).await?;

        let mut cache = self.cache.write().await;
        let mut installed = self.installed.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for (collection, rows) in collections.iter().zip(loaded) {
            let newest = installed.entry(*collection).or_insert(0);
            if *newest > ticket {
                debug!(collection = ?collection, ticket, newest = *newest, "dropping stale reload");
                continue;
            }
            *newest = ticket;
            cache.install(rows);
        }
        Ok(())
    }

    /// Empty every collection, for sign-out. Reloads already in flight are
    /// dropped when they finish.
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut installed = self.installed.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            for collection in Collection::ALL {
                installed.insert(collection, ticket);
            }
        }
        *cache = Collections::default();
        drop(cache);
        self.loading.store(false, Ordering::SeqCst);
        info!(user = %self.identity.id, "closed data session");
    }

    async fn load(&self, collection: Collection) -> Result<Loaded, DataError> {
        if collection.manager_only() && !self.identity.is_manager() {
            return Ok(match collection {
                Collection::Leads => Loaded::Leads(Vec::new()),
                _ => Loaded::Employees(Vec::new()),
            });
        }

        let table = collection.table();
        Ok(match collection {
            Collection::Projects => Loaded::Projects(self.fetch(table, collection).await?),
            Collection::Stages => Loaded::Stages(self.fetch(table, collection).await?),
            Collection::CommentTasks => Loaded::CommentTasks(self.fetch(table, collection).await?),
            Collection::Files => Loaded::Files(self.fetch(table, collection).await?),
            Collection::Leads => Loaded::Leads(self.fetch(table, collection).await?),
            Collection::Employees => Loaded::Employees(self.fetch(table, collection).await?),
            Collection::BrochureProjects => Loaded::BrochureProjects(self.fetch(table, collection).await?),
            Collection::BrochurePages => Loaded::BrochurePages(self.fetch(table, collection).await?),
            Collection::PageComments => Loaded::PageComments(self.fetch(table, collection).await?),
            Collection::DownloadHistory => Loaded::DownloadHistory(self.fetch(table, collection).await?),
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, table: Table, collection: Collection) -> Result<Vec<T>, DataError> {
        let rows = self.store.select(table, collection.query()).await?;
        debug!(table = %table, rows = rows.len(), "loaded collection");
        decode_rows(rows)
    }

    /// Author columns for rows written on behalf of the signed-in identity
    pub(crate) fn authored(&self, mut row: Row) -> Row {
        row.insert("added_by".to_string(), Value::String(self.identity.id.to_string()));
        row.insert("author_name".to_string(), Value::String(self.identity.name.clone()));
        row.insert("author_role".to_string(), Value::String(self.identity.role.as_str().to_string()));
        row
    }

    /// Serialize a payload and stamp it with the current identity under `column`
    pub(crate) fn stamped<T: serde::Serialize>(&self, payload: &T, column: &str) -> Result<Row, DataError> {
        let mut row = to_row(payload)?;
        row.insert(column.to_string(), Value::String(self.identity.id.to_string()));
        Ok(row)
    }

    /// Update the row with `id`, failing with `NotFound` if there is none
    pub(crate) async fn update_one(
        &self,
        table: Table,
        entity: &'static str,
        id: Uuid,
        changes: Changes,
    ) -> Result<(), DataError> {
        match self.store.update(table, by_id(id), changes).await? {
            0 => Err(DataError::not_found(entity, id)),
            _ => Ok(()),
        }
    }

    pub(crate) async fn delete_one(&self, table: Table, entity: &'static str, id: Uuid) -> Result<(), DataError> {
        match self.store.delete(table, by_id(id)).await? {
            0 => Err(DataError::not_found(entity, id)),
            _ => Ok(()),
        }
    }

    pub(crate) async fn apply(&self, mutations: Vec<Mutation>) -> Result<Vec<MutationOutcome>, DataError> {
        Ok(self.store.apply_atomic(mutations).await?)
    }
}

pub(crate) fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, DataError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(Value::Object(row)).map_err(DataError::from))
        .collect()
}

pub(crate) fn validation(result: Result<(), String>) -> Result<(), DataError> {
    result.map_err(DataError::Validation)
}
