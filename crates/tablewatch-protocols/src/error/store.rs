//! Storage backend errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    /// The statement was rejected; retrying it unchanged will not help.
    #[error("Query error: {0}")]
    Query(String),

    /// A row with the same temporal key already exists.
    #[error("Row for {table} at {key} already stored")]
    Conflict { table: String, key: String },

    #[error("Store is closed")]
    Closed,
}

impl StoreError {
    /// Whether retrying the same write later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Connection(_) | StoreError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_display() {
        let err = StoreError::Conflict {
            table: "German10yrbond".to_string(),
            key: "2024-01-01T14:30:05+00:00".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("German10yrbond"));
        assert!(display.contains("already stored"));
    }

    #[test]
    fn test_retryable() {
        assert!(StoreError::Connection("refused".to_string()).is_retryable());
        assert!(StoreError::Closed.is_retryable());
        assert!(!StoreError::Query("no such table: Missing".to_string()).is_retryable());
        assert!(!StoreError::Conflict {
            table: "t".to_string(),
            key: "k".to_string()
        }
        .is_retryable());
    }
}
