use serde_json::Value;
use sqlx::postgres::PgArguments;

use crate::database::manager::DatabaseError;
use crate::database::store::{Changes, Row};
use crate::filter::filter_where::FilterWhere;
use crate::filter::types::SqlResult;
use crate::filter::{Filter, FilterData};
use crate::types::Table;

/// Renders parameterized statements for one table. Rows travel as a single
/// jsonb parameter and are expanded with `jsonb_populate_record`, so column
/// types come from the table definition rather than from the JSON values.
/// Every statement returns whole rows as `row_to_json(...) AS "row"`.
pub struct QueryBuilder {
    table: Table,
    touch_updated_at: bool,
}

impl QueryBuilder {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            touch_updated_at: crate::database::schema::has_updated_at(table),
        }
    }

    fn name(&self) -> &'static str {
        self.table.as_str()
    }

    fn returning(&self) -> String {
        format!("RETURNING row_to_json(\"{}\".*) AS \"row\"", self.name())
    }

    pub fn select(&self, filter_data: FilterData) -> Result<SqlResult, DatabaseError> {
        let mut filter = Filter::new(self.name())?;
        filter.assign(filter_data)?;
        Ok(filter.to_json_sql()?)
    }

    pub fn insert(&self, row: &Row) -> Result<SqlResult, DatabaseError> {
        let columns = self.columns(row)?;
        if columns.is_empty() {
            return Ok(SqlResult {
                query: format!("INSERT INTO \"{}\" DEFAULT VALUES {}", self.name(), self.returning()),
                params: vec![],
            });
        }
        let list = columns.join(", ");
        Ok(SqlResult {
            query: format!(
                "INSERT INTO \"{t}\" ({list}) SELECT {list} FROM jsonb_populate_record(NULL::\"{t}\", $1::jsonb) {ret}",
                t = self.name(),
                list = list,
                ret = self.returning()
            ),
            params: vec![Value::Object(row.clone())],
        })
    }

    pub fn upsert(&self, row: &Row, conflict: &[&str]) -> Result<SqlResult, DatabaseError> {
        if conflict.is_empty() {
            return Err(DatabaseError::QueryError("upsert requires conflict columns".to_string()));
        }
        for column in conflict {
            if !Filter::is_valid_identifier(column) {
                return Err(DatabaseError::QueryError(format!("Invalid conflict column: {}", column)));
            }
        }
        let mut insert = self.insert(row)?;
        let targets: Vec<String> = conflict.iter().map(|c| format!("\"{}\"", c)).collect();

        let mut assignments: Vec<String> = row
            .keys()
            .filter(|k| !conflict.contains(&k.as_str()) && *k != "id" && *k != "created_at")
            .map(|k| format!("\"{k}\" = EXCLUDED.\"{k}\""))
            .collect();
        if self.touch_updated_at && !row.contains_key("updated_at") {
            assignments.push("\"updated_at\" = now()".to_string());
        }
        let action = if assignments.is_empty() {
            "DO NOTHING".to_string()
        } else {
            format!("DO UPDATE SET {}", assignments.join(", "))
        };

        let returning = self.returning();
        let head = insert.query.trim_end_matches(returning.as_str()).trim_end().to_string();
        insert.query = format!("{} ON CONFLICT ({}) {} {}", head, targets.join(", "), action, returning);
        Ok(insert)
    }

    pub fn update(&self, filter: &Value, changes: &Changes) -> Result<SqlResult, DatabaseError> {
        let mut params = Vec::new();
        let mut assignments = Vec::new();

        if !changes.set.is_empty() {
            params.push(Value::Object(changes.set.clone()));
            for column in self.columns(&changes.set)? {
                assignments.push(format!(
                    "{col} = (jsonb_populate_record(NULL::\"{t}\", $1::jsonb)).{col}",
                    col = column,
                    t = self.name()
                ));
            }
        }
        for (column, by) in &changes.increment {
            if !Filter::is_valid_identifier(column) {
                return Err(DatabaseError::QueryError(format!("Invalid column: {}", column)));
            }
            params.push(Value::from(*by));
            assignments.push(format!("\"{c}\" = coalesce(\"{c}\", 0) + ${n}", c = column, n = params.len()));
        }
        if self.touch_updated_at && !changes.set.contains_key("updated_at") {
            assignments.push("\"updated_at\" = now()".to_string());
        }
        if assignments.is_empty() {
            return Err(DatabaseError::QueryError("update requires at least one column".to_string()));
        }

        let (where_sql, where_params) = FilterWhere::generate(filter, params.len())?;
        params.extend(where_params);
        Ok(SqlResult {
            query: format!(
                "UPDATE \"{}\" SET {} WHERE {}",
                self.name(),
                assignments.join(", "),
                where_sql
            ),
            params,
        })
    }

    pub fn delete(&self, filter: &Value) -> Result<SqlResult, DatabaseError> {
        let (where_sql, params) = FilterWhere::generate(filter, 0)?;
        Ok(SqlResult {
            query: format!("DELETE FROM \"{}\" WHERE {}", self.name(), where_sql),
            params,
        })
    }

    fn columns(&self, row: &Row) -> Result<Vec<String>, DatabaseError> {
        row.keys()
            .map(|k| {
                if Filter::is_valid_identifier(k) {
                    Ok(format!("\"{}\"", k))
                } else {
                    Err(DatabaseError::QueryError(format!("Invalid column: {}", k)))
                }
            })
            .collect()
    }
}

/// Bind one where-clause or payload value with its natural Postgres type
pub fn bind_param<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                // Postgres doesn't have u64; cast down if safe
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        // Row payloads and the rare array literal travel as jsonb
        Value::Array(_) | Value::Object(_) => q.bind(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn insert_expands_json_payload() {
        let sql = QueryBuilder::new(Table::Leads)
            .insert(&row(json!({ "name": "Acme", "estimated_amount": 1200.5 })))
            .unwrap();
        assert_eq!(
            sql.query,
            "INSERT INTO \"leads\" (\"estimated_amount\", \"name\") SELECT \"estimated_amount\", \"name\" \
             FROM jsonb_populate_record(NULL::\"leads\", $1::jsonb) RETURNING row_to_json(\"leads\".*) AS \"row\""
        );
        assert_eq!(sql.params.len(), 1);
    }

    #[test]
    fn update_numbers_where_after_payload() {
        let changes = Changes::set(row(json!({ "last_downloaded_by": "u1" }))).with_increment("download_count", 1);
        let sql = QueryBuilder::new(Table::Files)
            .update(&json!({ "id": "f1" }), &changes)
            .unwrap();
        assert_eq!(
            sql.query,
            "UPDATE \"files\" SET \"last_downloaded_by\" = (jsonb_populate_record(NULL::\"files\", $1::jsonb)).\"last_downloaded_by\", \
             \"download_count\" = coalesce(\"download_count\", 0) + $2 WHERE \"id\"::text = $3"
        );
        assert_eq!(sql.params, vec![json!({ "last_downloaded_by": "u1" }), json!(1), json!("f1")]);
    }

    #[test]
    fn update_touches_updated_at_where_present() {
        let changes = Changes::set(row(json!({ "title": "New" })));
        let sql = QueryBuilder::new(Table::Projects).update(&json!({ "id": "p1" }), &changes).unwrap();
        assert!(sql.query.contains("\"updated_at\" = now()"), "{}", sql.query);
    }

    #[test]
    fn empty_update_is_rejected() {
        let err = QueryBuilder::new(Table::DownloadHistory)
            .update(&json!({ "id": "h1" }), &Changes::default())
            .unwrap_err();
        assert!(matches!(err, DatabaseError::QueryError(_)));
    }

    #[test]
    fn upsert_overwrites_non_key_columns() {
        let sql = QueryBuilder::new(Table::BrochurePages)
            .upsert(
                &row(json!({ "project_id": "b1", "page_number": 2, "content": {} })),
                &["project_id", "page_number"],
            )
            .unwrap();
        assert!(sql.query.contains("ON CONFLICT (\"project_id\", \"page_number\") DO UPDATE SET \"content\" = EXCLUDED.\"content\", \"updated_at\" = now()"), "{}", sql.query);
        assert!(sql.query.ends_with("RETURNING row_to_json(\"brochure_pages\".*) AS \"row\""));
    }

    #[test]
    fn hostile_column_names_are_rejected() {
        let err = QueryBuilder::new(Table::Leads)
            .insert(&row(json!({ "name\" text); DROP TABLE leads; --": 1 })))
            .unwrap_err();
        assert!(matches!(err, DatabaseError::QueryError(_)));
    }
}
