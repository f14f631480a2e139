//! In-process store holding every table as a vector of JSON rows. Used by
//! the development preset and the test suite; applies the same defaults,
//! unique keys and cascades as `sql/schema.sql`.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::schema;
use crate::database::store::{Changes, Mutation, MutationOutcome, RemoteStore, Row};
use crate::filter::filter_match::{values_equal, FilterMatch};
use crate::filter::filter_order::FilterOrder;
use crate::filter::{Filter, FilterData};
use crate::types::Table;

#[derive(Debug, Clone, Default)]
struct Tables {
    rows: HashMap<Table, Vec<Row>>,
    last_stamp: Option<DateTime<Utc>>,
}

impl Tables {
    /// Strictly increasing clock, so rows written in the same microsecond
    /// still order by write time.
    fn now(&mut self) -> String {
        let mut now = Utc::now();
        if let Some(last) = self.last_stamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_stamp = Some(now);
        now.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn table(&self, table: Table) -> &[Row] {
        self.rows.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }

    fn table_mut(&mut self, table: Table) -> &mut Vec<Row> {
        self.rows.entry(table).or_default()
    }

    fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Row>, DatabaseError> {
        let mut matched = Vec::new();
        for row in self.table(table) {
            let keep = match filter.where_data() {
                Some(clause) => FilterMatch::matches(clause, row)?,
                None => true,
            };
            if keep {
                matched.push(row.clone());
            }
        }

        // Stable, so ties keep insertion order
        matched.sort_by(|a, b| FilterOrder::compare(filter.order_data(), a, b));

        let offset = filter.offset_value().unwrap_or(0).max(0) as usize;
        let mut rows: Vec<Row> = matched.into_iter().skip(offset).collect();
        if let Some(limit) = filter.limit_value() {
            rows.truncate(limit.max(0) as usize);
        }

        let columns = filter.select_columns();
        if !columns.is_empty() && !columns.iter().any(|c| c == "*") {
            for row in rows.iter_mut() {
                row.retain(|k, _| columns.iter().any(|c| c == k));
            }
        }
        Ok(rows)
    }

    fn insert(&mut self, table: Table, mut row: Row) -> Result<Row, DatabaseError> {
        let now = self.now();
        if !row.get("id").map(|v| v.is_string()).unwrap_or(false) {
            row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        for column in schema::timestamp_columns(table) {
            if row.get(*column).map(Value::is_null).unwrap_or(true) {
                row.insert((*column).to_string(), Value::String(now.clone()));
            }
        }
        for (column, value) in schema::defaults(table) {
            row.entry(column.to_string()).or_insert(value);
        }

        self.check_unique(table, &row, None)?;
        self.table_mut(table).push(row.clone());
        Ok(row)
    }

    fn check_unique(&self, table: Table, row: &Row, skip: Option<usize>) -> Result<(), DatabaseError> {
        let mut keys: Vec<&[&str]> = vec![&["id"]];
        keys.extend(schema::unique_keys(table).iter().copied());
        for (index, existing) in self.table(table).iter().enumerate() {
            if Some(index) == skip {
                continue;
            }
            for key in &keys {
                let collides = key.iter().all(|column| {
                    match (existing.get(*column), row.get(*column)) {
                        (Some(a), Some(b)) if !a.is_null() && !b.is_null() => values_equal(a, b),
                        _ => false,
                    }
                });
                if collides {
                    return Err(DatabaseError::Conflict(format!(
                        "duplicate key on {} ({})",
                        table,
                        key.join(", ")
                    )));
                }
            }
        }
        Ok(())
    }

    fn update(&mut self, table: Table, filter: &Value, changes: &Changes) -> Result<u64, DatabaseError> {
        if changes.is_empty() && !schema::has_updated_at(table) {
            return Err(DatabaseError::QueryError("update requires at least one column".to_string()));
        }
        let now = self.now();
        let touch = schema::has_updated_at(table) && !changes.set.contains_key("updated_at");

        let mut indexes = Vec::new();
        for (index, row) in self.table(table).iter().enumerate() {
            if FilterMatch::matches(filter, row)? {
                indexes.push(index);
            }
        }

        for &index in &indexes {
            let mut row = self.table(table)[index].clone();
            for (column, value) in &changes.set {
                row.insert(column.clone(), value.clone());
            }
            for (column, by) in &changes.increment {
                let current = row.get(column).and_then(Value::as_i64).unwrap_or(0);
                row.insert(column.clone(), Value::from(current + by));
            }
            if touch {
                row.insert("updated_at".to_string(), Value::String(now.clone()));
            }
            self.check_unique(table, &row, Some(index))?;
            self.table_mut(table)[index] = row;
        }
        Ok(indexes.len() as u64)
    }

    fn delete(&mut self, table: Table, filter: &Value) -> Result<u64, DatabaseError> {
        let mut removed = Vec::new();
        let mut kept = Vec::new();
        for row in std::mem::take(self.table_mut(table)) {
            if FilterMatch::matches(filter, &row)? {
                removed.push(row);
            } else {
                kept.push(row);
            }
        }
        *self.table_mut(table) = kept;

        let ids: Vec<Value> = removed.iter().filter_map(|r| r.get("id").cloned()).collect();
        if !ids.is_empty() {
            for (child, column) in schema::cascades(table) {
                self.delete(*child, &serde_json::json!({ *column: { "$in": ids.clone() } }))?;
            }
            for (child, column) in schema::set_null_on_delete(table) {
                let mut set = Row::new();
                set.insert((*column).to_string(), Value::Null);
                self.update(
                    *child,
                    &serde_json::json!({ *column: { "$in": ids.clone() } }),
                    &Changes::set(set),
                )?;
            }
        }
        Ok(removed.len() as u64)
    }

    fn upsert(&mut self, table: Table, row: Row, conflict: &[&str]) -> Result<Row, DatabaseError> {
        let existing = self.table(table).iter().position(|candidate| {
            conflict.iter().all(|column| match (candidate.get(*column), row.get(*column)) {
                (Some(a), Some(b)) => values_equal(a, b),
                _ => false,
            })
        });

        let Some(index) = existing else {
            return self.insert(table, row);
        };

        let now = self.now();
        let mut merged = self.table(table)[index].clone();
        for (column, value) in row {
            if column != "id" && column != "created_at" {
                merged.insert(column, value);
            }
        }
        if schema::has_updated_at(table) {
            merged.insert("updated_at".to_string(), Value::String(now));
        }
        self.check_unique(table, &merged, Some(index))?;
        self.table_mut(table)[index] = merged.clone();
        Ok(merged)
    }

    fn apply(&mut self, mutation: Mutation) -> Result<MutationOutcome, DatabaseError> {
        match mutation {
            Mutation::Insert { table, row } => Ok(MutationOutcome::Rows(vec![self.insert(table, row)?])),
            Mutation::Update { table, filter, changes, require_match } => {
                let affected = self.update(table, &filter, &changes)?;
                if require_match && affected == 0 {
                    return Err(DatabaseError::NoMatch { table, filter: filter.to_string() });
                }
                Ok(MutationOutcome::Affected(affected))
            }
            Mutation::Delete { table, filter } => Ok(MutationOutcome::Affected(self.delete(table, &filter)?)),
            Mutation::Upsert { table, row, conflict } => {
                let conflict: Vec<&str> = conflict.iter().map(String::as_str).collect();
                Ok(MutationOutcome::Rows(vec![self.upsert(table, row, &conflict)?]))
            }
        }
    }
}

/// Tables guarded by one lock; every operation is atomic with respect to
/// every other.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    failing: RwLock<HashSet<Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert rows as an administrator would, bypassing any session.
    pub async fn seed(&self, table: Table, rows: Vec<Row>) -> Result<Vec<Row>, DatabaseError> {
        let mut tables = self.tables.write().await;
        rows.into_iter().map(|row| tables.insert(table, row)).collect()
    }

    /// Make every operation touching `table` fail until cleared, for
    /// exercising error paths against an otherwise healthy store.
    pub async fn fail_table(&self, table: Table) {
        self.failing.write().await.insert(table);
    }

    pub async fn clear_failures(&self) {
        self.failing.write().await.clear();
    }

    /// Current contents of a table, in insertion order
    pub async fn dump(&self, table: Table) -> Vec<Row> {
        self.tables.read().await.table(table).to_vec()
    }

    async fn guard(&self, table: Table) -> Result<(), DatabaseError> {
        if self.failing.read().await.contains(&table) {
            return Err(DatabaseError::QueryError(format!("{} is unavailable", table)));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn select(&self, table: Table, filter_data: FilterData) -> Result<Vec<Row>, DatabaseError> {
        self.guard(table).await?;
        let mut filter = Filter::new(table.as_str())?;
        filter.assign(filter_data)?;
        self.tables.read().await.select(table, &filter)
    }

    async fn insert(&self, table: Table, rows: Vec<Row>) -> Result<Vec<Row>, DatabaseError> {
        let outcomes = self
            .apply_atomic(rows.into_iter().map(|row| Mutation::Insert { table, row }).collect())
            .await?;
        Ok(outcomes
            .into_iter()
            .flat_map(|o| match o {
                MutationOutcome::Rows(rows) => rows,
                MutationOutcome::Affected(_) => vec![],
            })
            .collect())
    }

    async fn update(&self, table: Table, filter: Value, changes: Changes) -> Result<u64, DatabaseError> {
        self.guard(table).await?;
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        let affected = staged.update(table, &filter, &changes)?;
        *tables = staged;
        Ok(affected)
    }

    async fn delete(&self, table: Table, filter: Value) -> Result<u64, DatabaseError> {
        self.guard(table).await?;
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        let removed = staged.delete(table, &filter)?;
        *tables = staged;
        Ok(removed)
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
        Ok(outcomes
            .into_iter()
            .flat_map(|o| match o {
                MutationOutcome::Rows(rows) => rows,
                MutationOutcome::Affected(_) => vec![],
            })
            .collect())
    }

    async fn apply_atomic(&self, mutations: Vec<Mutation>) -> Result<Vec<MutationOutcome>, DatabaseError> {
        for mutation in &mutations {
            self.guard(mutation.table()).await?;
        }
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        let mut outcomes = Vec::with_capacity(mutations.len());
        for mutation in mutations {
            outcomes.push(staged.apply(mutation)?);
        }
        *tables = staged;
        Ok(outcomes)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_applies_defaults_and_ids() {
        let store = MemoryStore::new();
        let rows = store
            .insert(Table::Leads, vec![row(json!({ "name": "Acme", "created_by": "u1" }))])
            .await
            .unwrap();
        let lead = &rows[0];
        assert!(lead["id"].is_string());
        assert_eq!(lead["notes"], json!(""));
        assert!(lead["created_at"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn select_filters_orders_and_limits() {
        let store = MemoryStore::new();
        for n in [3, 1, 2] {
            store
                .seed(Table::BrochurePages, vec![row(json!({ "project_id": "b1", "page_number": n }))])
                .await
                .unwrap();
        }
        store
            .seed(Table::BrochurePages, vec![row(json!({ "project_id": "b2", "page_number": 1 }))])
            .await
            .unwrap();

        let pages = store
            .select(
                Table::BrochurePages,
                FilterData::new().with_where(json!({ "project_id": "b1" })).with_order("page_number asc").with_limit(2),
            )
            .await
            .unwrap();
        let numbers: Vec<i64> = pages.iter().map(|p| p["page_number"].as_i64().unwrap()).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[tokio::test]
    async fn increments_accumulate() {
        let store = MemoryStore::new();
        let file = store
            .seed(Table::Files, vec![row(json!({ "project_id": "p1", "filename": "a.pdf", "file_url": "u" }))])
            .await
            .unwrap()
            .remove(0);
        let id = file["id"].clone();
        for _ in 0..3 {
            let changes = Changes::default().with_increment("download_count", 1);
            assert_eq!(store.update(Table::Files, json!({ "id": id }), changes).await.unwrap(), 1);
        }
        let stored = store.dump(Table::Files).await;
        assert_eq!(stored[0]["download_count"], json!(3));
    }

    #[tokio::test]
    async fn unique_page_numbers_conflict_but_upsert_merges() {
        let store = MemoryStore::new();
        let page = row(json!({ "project_id": "b1", "page_number": 1, "content": { "v": 1 } }));
        store.insert(Table::BrochurePages, vec![page.clone()]).await.unwrap();

        let err = store.insert(Table::BrochurePages, vec![page]).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));

        let merged = store
            .upsert(
                Table::BrochurePages,
                vec![row(json!({ "project_id": "b1", "page_number": 1, "content": { "v": 2 } }))],
                &["project_id", "page_number"],
            )
            .await
            .unwrap();
        assert_eq!(merged[0]["content"], json!({ "v": 2 }));
        assert_eq!(store.dump(Table::BrochurePages).await.len(), 1);
    }

    #[tokio::test]
    async fn atomic_batch_rolls_back_on_unmatched_update() {
        let store = MemoryStore::new();
        let result = store
            .apply_atomic(vec![
                Mutation::Insert { table: Table::Leads, row: row(json!({ "name": "Ghost" })) },
                Mutation::Update {
                    table: Table::Stages,
                    filter: json!({ "id": "missing" }),
                    changes: Changes::default().with("notes", "x"),
                    require_match: true,
                },
            ])
            .await;
        assert!(matches!(result, Err(DatabaseError::NoMatch { .. })));
        assert!(store.dump(Table::Leads).await.is_empty());
    }

    #[tokio::test]
    async fn deleting_a_project_cascades() {
        let store = MemoryStore::new();
        let project = store
            .seed(Table::Projects, vec![row(json!({ "title": "Site", "client_id": "c1", "deadline": "2025-03-01" }))])
            .await
            .unwrap()
            .remove(0);
        let pid = project["id"].clone();
        let file = store
            .seed(Table::Files, vec![row(json!({ "project_id": pid, "filename": "a", "file_url": "u" }))])
            .await
            .unwrap()
            .remove(0);
        store
            .seed(Table::DownloadHistory, vec![row(json!({ "file_id": file["id"], "downloaded_by": "u1" }))])
            .await
            .unwrap();
        store.seed(Table::Stages, vec![row(json!({ "project_id": pid, "name": "Design" }))]).await.unwrap();

        assert_eq!(store.delete(Table::Projects, json!({ "id": pid })).await.unwrap(), 1);
        assert!(store.dump(Table::Stages).await.is_empty());
        assert!(store.dump(Table::Files).await.is_empty());
        assert!(store.dump(Table::DownloadHistory).await.is_empty());
    }

    #[tokio::test]
    async fn failing_tables_reject_reads() {
        let store = MemoryStore::new();
        store.fail_table(Table::Leads).await;
        assert!(store.select(Table::Leads, FilterData::new()).await.is_err());
        store.clear_failures().await;
        assert!(store.select(Table::Leads, FilterData::new()).await.unwrap().is_empty());
    }
}
