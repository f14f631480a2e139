use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgConnection, PgPool, Row as _};
use tracing::debug;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::query_builder::{bind_param, QueryBuilder};
use crate::database::store::{Changes, Mutation, MutationOutcome, RemoteStore, Row};
use crate::filter::types::SqlResult;
use crate::filter::FilterData;
use crate::types::Table;

/// Store backed by the hosted Postgres database
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect through the shared pool configured from `DATABASE_URL`
    pub async fn connect() -> Result<Self, DatabaseError> {
        Ok(Self::new(DatabaseManager::main_pool().await?))
    }

    fn log(sql: &SqlResult) {
        if crate::config::config().database.enable_query_logging {
            debug!(query = %sql.query, params = sql.params.len(), "executing");
        }
    }

    async fn fetch_rows(conn: &mut PgConnection, sql: SqlResult) -> Result<Vec<Row>, DatabaseError> {
        Self::log(&sql);
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = bind_param(q, p);
        }
        let records = q.fetch_all(&mut *conn).await?;
        records
            .into_iter()
            .map(|record| match record.try_get::<Value, _>("row")? {
                Value::Object(row) => Ok(row),
                other => Err(DatabaseError::QueryError(format!("expected row object, got {}", other))),
            })
            .collect()
    }

    async fn execute(conn: &mut PgConnection, sql: SqlResult) -> Result<u64, DatabaseError> {
        Self::log(&sql);
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = bind_param(q, p);
        }
        Ok(q.execute(&mut *conn).await?.rows_affected())
    }

    async fn apply(conn: &mut PgConnection, mutation: Mutation) -> Result<MutationOutcome, DatabaseError> {
        match mutation {
            Mutation::Insert { table, row } => {
                let sql = QueryBuilder::new(table).insert(&row)?;
                Ok(MutationOutcome::Rows(Self::fetch_rows(conn, sql).await.map_err(conflict)?))
            }
            Mutation::Update { table, filter, changes, require_match } => {
                let sql = QueryBuilder::new(table).update(&filter, &changes)?;
                let affected = Self::execute(conn, sql).await.map_err(conflict)?;
                if require_match && affected == 0 {
                    return Err(DatabaseError::NoMatch { table, filter: filter.to_string() });
                }
                Ok(MutationOutcome::Affected(affected))
            }
            Mutation::Delete { table, filter } => {
                let sql = QueryBuilder::new(table).delete(&filter)?;
                Ok(MutationOutcome::Affected(Self::execute(conn, sql).await?))
            }
            Mutation::Upsert { table, row, conflict: columns } => {
                let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
                let sql = QueryBuilder::new(table).upsert(&row, &columns)?;
                Ok(MutationOutcome::Rows(Self::fetch_rows(conn, sql).await.map_err(conflict)?))
            }
        }
    }

    fn rows(outcomes: Vec<MutationOutcome>) -> Vec<Row> {
        outcomes
            .into_iter()
            .flat_map(|o| match o {
                MutationOutcome::Rows(rows) => rows,
                MutationOutcome::Affected(_) => vec![],
            })
            .collect()
    }
}

/// Unique violations surface as conflicts rather than opaque driver errors
fn conflict(err: DatabaseError) -> DatabaseError {
    if let DatabaseError::Sqlx(sqlx::Error::Database(db)) = &err {
        if db.code().as_deref() == Some("23505") {
            return DatabaseError::Conflict(db.message().to_string());
        }
    }
    err
}

#[async_trait]
impl RemoteStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn select(&self, table: Table, filter: FilterData) -> Result<Vec<Row>, DatabaseError> {
        let sql = QueryBuilder::new(table).select(filter)?;
        let mut conn = self.pool.acquire().await?;
        Self::fetch_rows(&mut conn, sql).await
    }

    async fn insert(&self, table: Table, rows: Vec<Row>) -> Result<Vec<Row>, DatabaseError> {
        let outcomes = self
            .apply_atomic(rows.into_iter().map(|row| Mutation::Insert { table, row }).collect())
            .await?;
        Ok(Self::rows(outcomes))
    }

    async fn update(&self, table: Table, filter: Value, changes: Changes) -> Result<u64, DatabaseError> {
        let outcomes = self
            .apply_atomic(vec![Mutation::Update { table, filter, changes, require_match: false }])
            .await?;
        Ok(outcomes.iter().map(MutationOutcome::affected).sum())
    }

    async fn delete(&self, table: Table, filter: Value) -> Result<u64, DatabaseError> {
        let sql = QueryBuilder::new(table).delete(&filter)?;
        let mut conn = self.pool.acquire().await?;
        Self::execute(&mut conn, sql).await
    }

    async fn upsert(&self, table: Table, rows: Vec<Row>, conflict: &[&str]) -> Result<Vec<Row>, DatabaseError> {
        let conflict: Vec<String> = conflict.iter().map(|c| c.to_string()).collect();
        let outcomes = self
            .apply_atomic(
                rows.into_iter()
                    .map(|row| Mutation::Upsert { table, row, conflict: conflict.clone() })
                    .collect(),
            )
            .await?;
        Ok(Self::rows(outcomes))
    }

    async fn apply_atomic(&self, mutations: Vec<Mutation>) -> Result<Vec<MutationOutcome>, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut outcomes = Vec::with_capacity(mutations.len());
        for mutation in mutations {
            // Dropping the transaction on error rolls it back
            outcomes.push(Self::apply(&mut tx, mutation).await?);
        }
        tx.commit().await?;
        Ok(outcomes)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
