//! # tablewatch config
//!
//! Structured, validated configuration for a tablewatch instance: the
//! watched source, the rendering engine, storage, cycle timing, logging and
//! the target schema.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
