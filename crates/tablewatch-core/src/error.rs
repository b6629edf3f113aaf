//! Pipeline errors. Every variant is fatal for the run.

use thiserror::Error;

/// Failures turning markup into a [`crate::TableSnapshot`] or reading a
/// cell out of one.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Invalid table locator '{0}'")]
    InvalidLocator(String),

    #[error("No table matches {0}")]
    TableNotFound(String),

    #[error("Table {0} has no head row")]
    MissingHead(String),

    #[error("Column '{0}' not found in table")]
    UnknownColumn(String),

    #[error("No row labelled '{row}' in column '{column}'")]
    RowNotFound { row: String, column: String },

    #[error("{count} rows labelled '{row}' in column '{column}'")]
    AmbiguousRow {
        row: String,
        column: String,
        count: usize,
    },

    #[error("Column '{0}' appears more than once in the table head")]
    AmbiguousColumn(String),
}

/// Failures typing a projected cell.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectError {
    #[error(transparent)]
    Lookup(#[from] ExtractError),

    #[error("Field '{field}' of '{target}' is not a number: '{value}'")]
    InvalidNumber {
        target: String,
        field: String,
        value: String,
    },

    #[error("Unrecognized source time format: '{0}'")]
    DateFormat(String),

    #[error("Unsupported source timezone '{0}'")]
    UnsupportedTimezone(String),
}
