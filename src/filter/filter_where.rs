use serde_json::Value;

use super::error::FilterError;
use super::filter::Filter;
use super::types::{FilterOp, FilterWhereInfo};

pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
    conditions: Vec<FilterWhereInfo>,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
            conditions: vec![],
        }
    }

    /// Render a where clause. Placeholders are numbered from
    /// `starting_param_index + 1`, so callers that already bound values
    /// (an UPDATE payload, say) pass the count they used.
    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        filter_where.build(where_data)
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        if where_data.is_null() { return Ok(()); }
        match where_data {
            Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn build(&mut self, where_data: &Value) -> Result<(String, Vec<Value>), FilterError> {
        self.param_values.clear();
        self.conditions.clear();

        if where_data.is_null() {
            return Ok(("1=1".to_string(), vec![]));
        }
        self.parse_where_data(where_data)?;

        let mut sql_conditions = vec![];
        let conditions_snapshot = self.conditions.clone();
        for condition in &conditions_snapshot {
            if let Some(sql) = self.build_sql_condition(condition)? { sql_conditions.push(sql); }
        }
        let where_clause = if sql_conditions.is_empty() { "1=1".to_string() } else { sql_conditions.join(" AND ") };
        Ok((where_clause, self.param_values.clone()))
    }

    fn parse_where_data(&mut self, where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Object(obj) => {
                for (key, value) in obj {
                    if key.starts_with('$') {
                        self.parse_logical_operator(key, value)?;
                    } else {
                        self.parse_field_condition(key, value)?;
                    }
                }
                Ok(())
            }
            _ => Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        }
    }

    fn parse_logical_operator(&mut self, op: &str, value: &Value) -> Result<(), FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value.as_array().ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                if arr.is_empty() {
                    let sql = if op == "$and" { "1=1" } else { "1=0" };
                    self.conditions.push(FilterWhereInfo { column: sql.to_string(), operator: FilterOp::Rendered, data: Value::Null });
                    return Ok(());
                }
                let mut sql_parts = Vec::new();
                for v in arr {
                    let (sql, params) = Self::generate(v, self.param_index)?;
                    self.param_index += params.len();
                    self.param_values.extend(params);
                    sql_parts.push(format!("({})", sql));
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                let combined = format!("({})", sql_parts.join(joiner));
                self.conditions.push(FilterWhereInfo { column: combined, operator: FilterOp::Rendered, data: Value::Null });
                Ok(())
            }
            "$not" => {
                let (sql, params) = Self::generate(value, self.param_index)?;
                self.param_index += params.len();
                self.param_values.extend(params);
                self.conditions.push(FilterWhereInfo { column: format!("NOT ({})", sql), operator: FilterOp::Rendered, data: Value::Null });
                Ok(())
            }
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(&mut self, field: &str, value: &Value) -> Result<(), FilterError> {
        if !Filter::is_valid_identifier(field) {
            return Err(FilterError::InvalidColumn(format!("Invalid column name format: {}", field)));
        }
        if let Value::Object(obj) = value {
            for (op_key, op_val) in obj {
                let operator = Self::map_operator(op_key)?;
                self.conditions.push(FilterWhereInfo { column: field.to_string(), operator, data: op_val.clone() });
            }
        } else {
            // Implicit equality: { field: value }
            self.conditions.push(FilterWhereInfo { column: field.to_string(), operator: FilterOp::Eq, data: value.clone() });
        }
        Ok(())
    }

    pub fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        FilterOp::parse(op_key).ok_or_else(|| FilterError::UnsupportedOperator(op_key.to_string()))
    }

    /// Strings are bound as text, so the column is compared in its text form.
    /// That keeps uuid, date and enum-like columns comparable without
    /// per-column type knowledge.
    fn column_for(quoted_column: &str, data: &Value) -> String {
        match data {
            Value::String(_) => format!("{}::text", quoted_column),
            _ => quoted_column.to_string(),
        }
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<Option<String>, FilterError> {
        // Support pseudo conditions where column already contains SQL (for logical operators)
        if matches!(condition.operator, FilterOp::Rendered) && condition.data.is_null() {
            return Ok(Some(condition.column.clone()));
        }

        let quoted_column = format!("\"{}\"", condition.column);
        let column = Self::column_for(&quoted_column, &condition.data);
        match condition.operator {
            FilterOp::Eq => {
                if condition.data.is_null() { Ok(Some(format!("{} IS NULL", quoted_column))) }
                else { Ok(Some(format!("{} = {}", column, self.param(condition.data.clone())))) }
            }
            FilterOp::Ne => {
                if condition.data.is_null() { Ok(Some(format!("{} IS NOT NULL", quoted_column))) }
                else { Ok(Some(format!("{} IS DISTINCT FROM {}", column, self.param(condition.data.clone())))) }
            }
            FilterOp::Gt => Ok(Some(format!("{} > {}", column, self.param(condition.data.clone())))),
            FilterOp::Gte => Ok(Some(format!("{} >= {}", column, self.param(condition.data.clone())))),
            FilterOp::Lt => Ok(Some(format!("{} < {}", column, self.param(condition.data.clone())))),
            FilterOp::Lte => Ok(Some(format!("{} <= {}", column, self.param(condition.data.clone())))),
            FilterOp::Like => Ok(Some(format!("{} LIKE {}", column, self.param(condition.data.clone())))),
            FilterOp::ILike => Ok(Some(format!("{} ILIKE {}", column, self.param(condition.data.clone())))),
            FilterOp::In | FilterOp::NIn => {
                let negate = matches!(condition.operator, FilterOp::NIn);
                let values = match &condition.data {
                    Value::Array(values) => values.clone(),
                    other => vec![other.clone()],
                };
                if values.is_empty() {
                    return Ok(Some(if negate { "1=1" } else { "1=0" }.to_string()));
                }
                let column = Self::column_for(&quoted_column, &values[0]);
                let params: Vec<String> = values.into_iter().map(|v| self.param(v)).collect();
                let keyword = if negate { "NOT IN" } else { "IN" };
                Ok(Some(format!("{} {} ({})", column, keyword, params.join(", "))))
            }
            FilterOp::Null => match condition.data {
                Value::Bool(true) => Ok(Some(format!("{} IS NULL", quoted_column))),
                Value::Bool(false) => Ok(Some(format!("{} IS NOT NULL", quoted_column))),
                _ => Err(FilterError::InvalidOperatorData("$null requires a boolean".to_string())),
            },
            FilterOp::Rendered => Ok(None),
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}
