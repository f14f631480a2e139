//! The remote store boundary: table-level reads and writes over JSON rows.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::database::manager::DatabaseError;
use crate::filter::FilterData;
use crate::types::Table;

/// One table row as a JSON object keyed by column name
pub type Row = Map<String, Value>;

/// Column assignments for an update. `set` values are stored as given;
/// `increment` columns are computed by the store from their current value,
/// so concurrent writers never lose an increment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changes {
    pub set: Row,
    pub increment: Vec<(String, i64)>,
}

impl Changes {
    pub fn set(fields: Row) -> Self {
        Self { set: fields, increment: Vec::new() }
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(column.into(), value.into());
        self
    }

    pub fn with_increment(mut self, column: impl Into<String>, by: i64) -> Self {
        self.increment.push((column.into(), by));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.increment.is_empty()
    }
}

/// A single write inside an atomic batch
#[derive(Debug, Clone)]
pub enum Mutation {
    Insert { table: Table, row: Row },
    /// With `require_match`, zero affected rows fails the whole batch.
    Update { table: Table, filter: Value, changes: Changes, require_match: bool },
    Delete { table: Table, filter: Value },
    Upsert { table: Table, row: Row, conflict: Vec<String> },
}

impl Mutation {
    pub fn table(&self) -> Table {
        match self {
            Mutation::Insert { table, .. }
            | Mutation::Update { table, .. }
            | Mutation::Delete { table, .. }
            | Mutation::Upsert { table, .. } => *table,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// Rows written, as stored (server defaults applied)
    Rows(Vec<Row>),
    /// Rows affected by an update or delete
    Affected(u64),
}

impl MutationOutcome {
    pub fn affected(&self) -> u64 {
        match self {
            MutationOutcome::Rows(rows) => rows.len() as u64,
            MutationOutcome::Affected(n) => *n,
        }
    }
}

/// Table-level access to the hosted relational store.
///
/// Filters use the where language from [`crate::filter`]. Every method is a
/// single round trip; `apply_atomic` commits all of its mutations or none.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;

    async fn select(&self, table: Table, filter: FilterData) -> Result<Vec<Row>, DatabaseError>;

    async fn insert(&self, table: Table, rows: Vec<Row>) -> Result<Vec<Row>, DatabaseError>;

    async fn update(&self, table: Table, filter: Value, changes: Changes) -> Result<u64, DatabaseError>;

    async fn delete(&self, table: Table, filter: Value) -> Result<u64, DatabaseError>;

    /// Insert, or overwrite the row that collides on `conflict` columns
    async fn upsert(&self, table: Table, rows: Vec<Row>, conflict: &[&str]) -> Result<Vec<Row>, DatabaseError>;

    async fn apply_atomic(&self, mutations: Vec<Mutation>) -> Result<Vec<MutationOutcome>, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}

/// `{"id": <id>}` filter, the shape nearly every command writes through
pub fn by_id(id: impl std::fmt::Display) -> Value {
    let mut filter = Map::new();
    filter.insert("id".to_string(), Value::String(id.to_string()));
    Value::Object(filter)
}
