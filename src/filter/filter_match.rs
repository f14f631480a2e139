//! In-process evaluation of the where language, used by stores that keep
//! rows as JSON maps instead of rendering SQL.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_where::FilterWhere;
use super::types::FilterOp;

pub struct FilterMatch;

impl FilterMatch {
    pub fn matches(where_data: &Value, row: &Map<String, Value>) -> Result<bool, FilterError> {
        match where_data {
            Value::Null => Ok(true),
            Value::Object(obj) => {
                for (key, value) in obj {
                    let matched = if key.starts_with('$') {
                        Self::match_logical(key, value, row)?
                    } else {
                        Self::match_field(key, value, row)?
                    };
                    if !matched {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        }
    }

    fn match_logical(op: &str, value: &Value, row: &Map<String, Value>) -> Result<bool, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                let mut results = Vec::with_capacity(arr.len());
                for clause in arr {
                    results.push(Self::matches(clause, row)?);
                }
                Ok(if op == "$and" { results.iter().all(|r| *r) } else { results.iter().any(|r| *r) })
            }
            "$not" => Ok(!Self::matches(value, row)?),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn match_field(field: &str, value: &Value, row: &Map<String, Value>) -> Result<bool, FilterError> {
        let actual = row.get(field).unwrap_or(&Value::Null);
        if let Value::Object(ops) = value {
            for (op_key, op_val) in ops {
                let operator = FilterWhere::map_operator(op_key)?;
                if !Self::apply(operator, actual, op_val)? {
                    return Ok(false);
                }
            }
            Ok(true)
        } else {
            Self::apply(FilterOp::Eq, actual, value)
        }
    }

    fn apply(operator: FilterOp, actual: &Value, expected: &Value) -> Result<bool, FilterError> {
        Ok(match operator {
            FilterOp::Eq => {
                if expected.is_null() { actual.is_null() } else { !actual.is_null() && values_equal(actual, expected) }
            }
            FilterOp::Ne => {
                if expected.is_null() { !actual.is_null() } else { !values_equal(actual, expected) }
            }
            FilterOp::Gt => compare_values(actual, expected) == Some(Ordering::Greater),
            FilterOp::Gte => matches!(compare_values(actual, expected), Some(Ordering::Greater | Ordering::Equal)),
            FilterOp::Lt => compare_values(actual, expected) == Some(Ordering::Less),
            FilterOp::Lte => matches!(compare_values(actual, expected), Some(Ordering::Less | Ordering::Equal)),
            FilterOp::Like | FilterOp::ILike => {
                let (Some(text), Some(pattern)) = (actual.as_str(), expected.as_str()) else {
                    return Ok(false);
                };
                if matches!(operator, FilterOp::ILike) {
                    like(&text.to_lowercase(), &pattern.to_lowercase())
                } else {
                    like(text, pattern)
                }
            }
            FilterOp::In | FilterOp::NIn => {
                let found = match expected {
                    Value::Array(values) => values.iter().any(|v| !actual.is_null() && values_equal(actual, v)),
                    other => !actual.is_null() && values_equal(actual, other),
                };
                if matches!(operator, FilterOp::In) { found } else { !actual.is_null() && !found }
            }
            FilterOp::Null => match expected {
                Value::Bool(true) => actual.is_null(),
                Value::Bool(false) => !actual.is_null(),
                _ => return Err(FilterError::InvalidOperatorData("$null requires a boolean".to_string())),
            },
            FilterOp::Rendered => {
                return Err(FilterError::UnsupportedOperator("rendered SQL".to_string()));
            }
        })
    }
}

/// Equality with numeric coercion, so `1` matches `1.0`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Ordering between two scalars of the same JSON kind; `None` when they are
/// not comparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// SQL LIKE semantics: `%` matches any run, `_` matches one character.
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    // dp[j] = pattern[..i] matches text[..j]
    let mut dp = vec![false; text.len() + 1];
    dp[0] = true;
    for p in &pattern {
        let mut next = vec![false; text.len() + 1];
        match p {
            '%' => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen = seen || dp[j];
                    next[j] = seen;
                }
            }
            '_' => {
                for j in 1..=text.len() {
                    next[j] = dp[j - 1];
                }
            }
            c => {
                for j in 1..=text.len() {
                    next[j] = dp[j - 1] && text[j - 1] == *c;
                }
            }
        }
        dp = next;
    }
    dp[text.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row() -> Map<String, Value> {
        json!({
            "id": "pg1",
            "page_number": 3,
            "is_locked": false,
            "locked_by": null,
            "title": "Site Redesign",
            "assigned_employees": ["e1", "e2"]
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn implicit_equality_and_null() {
        assert!(FilterMatch::matches(&json!({ "id": "pg1", "locked_by": null }), &row()).unwrap());
        assert!(!FilterMatch::matches(&json!({ "id": "pg2" }), &row()).unwrap());
    }

    #[test]
    fn numeric_comparisons() {
        assert!(FilterMatch::matches(&json!({ "page_number": { "$gte": 3, "$lt": 4.5 } }), &row()).unwrap());
        assert!(!FilterMatch::matches(&json!({ "page_number": { "$gt": 3 } }), &row()).unwrap());
    }

    #[test]
    fn logical_groups() {
        let clause = json!({ "id": "pg1", "$or": [ { "locked_by": "u1" }, { "is_locked": false } ] });
        assert!(FilterMatch::matches(&clause, &row()).unwrap());
        let clause = json!({ "$not": { "is_locked": false } });
        assert!(!FilterMatch::matches(&clause, &row()).unwrap());
    }

    #[test]
    fn membership() {
        assert!(FilterMatch::matches(&json!({ "id": { "$in": ["pg0", "pg1"] } }), &row()).unwrap());
        assert!(FilterMatch::matches(&json!({ "id": { "$nin": ["pg0"] } }), &row()).unwrap());
        assert!(!FilterMatch::matches(&json!({ "locked_by": { "$nin": ["u1"] } }), &row()).unwrap());
    }

    #[test]
    fn like_patterns() {
        assert!(FilterMatch::matches(&json!({ "title": { "$like": "Site%" } }), &row()).unwrap());
        assert!(!FilterMatch::matches(&json!({ "title": { "$like": "site%" } }), &row()).unwrap());
        assert!(FilterMatch::matches(&json!({ "title": { "$ilike": "%REDES_GN" } }), &row()).unwrap());
    }

    #[test]
    fn string_clauses_and_unknown_operators_are_rejected() {
        assert!(FilterMatch::matches(&json!("1=1"), &row()).is_err());
        assert!(FilterMatch::matches(&json!({ "assigned_employees": { "$size": 2 } }), &row()).is_err());
    }
}
