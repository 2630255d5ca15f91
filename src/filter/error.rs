use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    #[error("Invalid value for column {column}: {reason}")]
    InvalidValue { column: String, reason: String },
}
