//! Record schema errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Schema has no targets")]
    Empty,

    #[error("Target '{0}' has no fields")]
    NoFields(String),

    #[error("Target '{target}' must list temporal field '{field}' first")]
    TemporalNotFirst { target: String, field: String },

    #[error("Target '{target}' lists temporal field '{field}' more than once")]
    TemporalRepeated { target: String, field: String },

    #[error("Duplicate target name '{0}'")]
    DuplicateTarget(String),

    #[error("Target '{target}' has duplicate field '{field}'")]
    DuplicateField { target: String, field: String },
}
