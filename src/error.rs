use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage is unavailable")]
    Unavailable,

    #[error("Failed to read key '{key}': {reason}")]
    Read { key: String, reason: String },

    #[error("Failed to write key '{key}': {reason}")]
    Write { key: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a description")]
    EmptyDescription,

    #[error("Invalid amount '{0}'. Please provide a positive number")]
    InvalidAmount(String),

    #[error("Please pick a date")]
    MissingDate,

    #[error("Invalid date '{0}'. Use YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Unknown category '{0}'")]
    UnknownCategory(String),
}
