//! SQLite record store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rusqlite::types::Value;
use rusqlite::{ErrorCode, params_from_iter};
use tokio_rusqlite::Connection;
use tracing::{debug, info, warn};

use tablewatch_protocols::{FieldValue, Record, RecordStore, StoreError, TargetDefinition};

use crate::schema::{create_table_sql, insert_sql, last_row_sql};

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// SQLite-backed [`RecordStore`].
///
/// The connection is opened by [`RecordStore::connect`] and can be replaced
/// by [`RecordStore::reconnect`]. An in-memory store loses its contents on
/// reconnect.
pub struct SqliteRecordStore {
    location: Location,
    conn: RwLock<Option<Connection>>,
}

impl SqliteRecordStore {
    /// A store backed by the database file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            location: Location::File(path.as_ref().to_path_buf()),
            conn: RwLock::new(None),
        }
    }

    /// A private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            conn: RwLock::new(None),
        }
    }

    async fn open(&self) -> Result<Connection, StoreError> {
        let conn = match &self.location {
            Location::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| StoreError::Connection(e.to_string()))?;
                }
                Connection::open(path.clone()).await
            }
            Location::Memory => Connection::open_in_memory().await,
        }
        .map_err(|e| StoreError::Connection(e.to_string()))?;

        conn.call(|conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(conn)
    }

    fn conn(&self) -> Result<Connection, StoreError> {
        self.conn.read().clone().ok_or(StoreError::Closed)
    }
}

/// Map a driver error, recognising unique-key violations and contention.
fn map_error(e: tokio_rusqlite::Error, table: &str, key: &str) -> StoreError {
    match e {
        tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict {
                table: table.to_string(),
                key: key.to_string(),
            }
        }
        tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(err, msg))
            if matches!(err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
        {
            StoreError::Connection(msg.unwrap_or_else(|| err.to_string()))
        }
        tokio_rusqlite::Error::ConnectionClosed => StoreError::Closed,
        other => StoreError::Query(other.to_string()),
    }
}

fn to_sql(value: &FieldValue) -> Value {
    match value {
        FieldValue::Timestamp(ts) => Value::Text(ts.to_rfc3339()),
        FieldValue::Number(n) => Value::Real(*n),
        FieldValue::Null => Value::Null,
    }
}

fn from_sql(value: Value) -> FieldValue {
    match value {
        Value::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| FieldValue::Timestamp(dt.with_timezone(&Utc)))
            .unwrap_or(FieldValue::Null),
        Value::Real(n) => FieldValue::Number(n),
        Value::Integer(n) => FieldValue::Number(n as f64),
        Value::Null | Value::Blob(_) => FieldValue::Null,
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    fn id(&self) -> &str {
        "sqlite"
    }

    async fn connect(&self) -> Result<(), StoreError> {
        let conn = self.open().await?;
        *self.conn.write() = Some(conn);
        match &self.location {
            Location::File(path) => info!(path = %path.display(), "SQLite store connected"),
            Location::Memory => info!("In-memory SQLite store connected"),
        }
        Ok(())
    }

    async fn reconnect(&self) -> Result<(), StoreError> {
        let old = self.conn.write().take();
        if let Some(old) = old {
            if let Err(e) = old.close().await {
                warn!(error = %e, "Closing stale SQLite connection failed");
            }
        }
        self.connect().await
    }

    async fn ensure_table(
        &self,
        target: &TargetDefinition,
        temporal_field: &str,
    ) -> Result<(), StoreError> {
        let sql = create_table_sql(target, temporal_field);
        debug!(table = %target.name, "Ensuring table");
        self.conn()?
            .call(move |conn| {
                conn.execute_batch(&sql)?;
                Ok(())
            })
            .await
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn insert(&self, record: &Record) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let names: Vec<&str> = record.fields.iter().map(|(n, _)| n.as_str()).collect();
        let sql = insert_sql(&record.table, &names);
        let values: Vec<Value> = record.fields.iter().map(|(_, v)| to_sql(v)).collect();

        conn.call(move |conn| {
            conn.execute(&sql, params_from_iter(values))?;
            Ok(())
        })
        .await
        .map_err(|e| {
            let key = record
                .temporal()
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_default();
            map_error(e, &record.table, &key)
        })
    }

    async fn last_row(
        &self,
        target: &TargetDefinition,
        _temporal_field: &str,
    ) -> Result<Record, StoreError> {
        let conn = self.conn()?;
        let sql = last_row_sql(target);
        let width = target.fields.len();

        let row = conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let row = stmt.query_row([], |row| {
                    (0..width).map(|i| row.get::<_, Value>(i)).collect::<Result<Vec<_>, _>>()
                });
                match row {
                    Ok(values) => Ok(Some(values)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let Some(values) = row else {
            return Ok(Record::empty(target));
        };

        let fields = target
            .field_names()
            .zip(values)
            .map(|(name, value)| (name.to_string(), from_sql(value)))
            .collect();
        Ok(Record::new(target.name.clone(), fields))
    }

    async fn close(&self) -> Result<(), StoreError> {
        let conn = self.conn.write().take();
        match conn {
            Some(conn) => {
                conn.close()
                    .await
                    .map_err(|e| StoreError::Connection(e.to_string()))?;
                info!("SQLite store closed");
                Ok(())
            }
            None => Ok(()),
        }
    }
}
