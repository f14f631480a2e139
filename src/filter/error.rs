use thiserror::Error;

/// Rejections from parsing or rendering a query description.
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid table: {0}")]
    InvalidTableName(String),

    #[error("Invalid column: {0}")]
    InvalidColumn(String),

    #[error("Invalid where clause: {0}")]
    InvalidWhereClause(String),

    #[error("Unknown operator: {0}")]
    UnsupportedOperator(String),

    #[error("Bad operand: {0}")]
    InvalidOperatorData(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Invalid offset: {0}")]
    InvalidOffset(String),
}
