//! # tablewatch protocols
//!
//! Shared data model and the capability traits that sit at the seams of the
//! acquisition loop. Contains no engine or storage implementation.
//!
//! ## Core Traits
//!
//! - [`PageSource`] - A rendering session that yields page markup
//! - [`RecordStore`] - Durable, append-only storage for records
//!
//! ## Data Model
//!
//! - [`RecordSchema`] / [`TargetDefinition`] / [`FieldMapping`] - static schema
//! - [`Record`] / [`RecordSet`] / [`FieldValue`] - one cycle's typed output

pub mod error;
pub mod record;
pub mod schema;
pub mod session;
pub mod store;

pub use error::{SchemaError, SessionError, StoreError};
pub use record::{FieldValue, Record, RecordSet};
pub use schema::{
    FieldMapping, RecordSchema, SUPPORTED_TIMEZONES, TargetDefinition, is_supported_timezone,
};
pub use session::{EngineKind, PageSource};
pub use store::RecordStore;
