//! SQLite record store for tablewatch.
//!
//! One table per target, rows appended only.

mod schema;
mod store;

pub use store::SqliteRecordStore;
