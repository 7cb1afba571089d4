use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid WHERE clause: {0}")]
    InvalidWhereClause(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid operator data: {0}")]
    InvalidOperatorData(String),

    #[error("Invalid document id: {0}")]
    InvalidId(String),

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),
}
