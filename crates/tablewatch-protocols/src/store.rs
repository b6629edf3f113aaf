//! Storage protocol.
//!
//! One table per [`TargetDefinition`]; rows are only ever appended.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::Record;
use crate::schema::TargetDefinition;

/// Durable, append-only record storage.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Returns the backend ID.
    fn id(&self) -> &str;

    /// Open the underlying connection.
    async fn connect(&self) -> Result<(), StoreError>;

    /// Drop the current connection and open a new one.
    async fn reconnect(&self) -> Result<(), StoreError>;

    /// Create the target's table if it does not exist yet.
    async fn ensure_table(
        &self,
        target: &TargetDefinition,
        temporal_field: &str,
    ) -> Result<(), StoreError>;

    /// Append one row.
    async fn insert(&self, record: &Record) -> Result<(), StoreError>;

    /// The most recently inserted row, or a record of `Null`s when the
    /// table is empty.
    async fn last_row(
        &self,
        target: &TargetDefinition,
        temporal_field: &str,
    ) -> Result<Record, StoreError>;

    /// Close the connection and release pooled resources.
    async fn close(&self) -> Result<(), StoreError>;
}
