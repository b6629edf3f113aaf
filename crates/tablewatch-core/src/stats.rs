//! Cumulative write statistics, owned by the run loop and lent to the
//! persister.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct WriteStats {
    rows_written: u64,
    rows_dropped: u64,
    conflicts: u64,
    last_write: Instant,
    last_write_at: Option<DateTime<Utc>>,
}

impl Default for WriteStats {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteStats {
    /// Fresh statistics; "since last write" counts from now.
    pub fn new() -> Self {
        Self {
            rows_written: 0,
            rows_dropped: 0,
            conflicts: 0,
            last_write: Instant::now(),
            last_write_at: None,
        }
    }

    /// Record one successful insert.
    pub fn record_write(&mut self) {
        self.rows_written += 1;
        self.last_write = Instant::now();
        self.last_write_at = Some(Utc::now());
    }

    /// Record a buffered row discarded on overflow.
    pub fn record_dropped(&mut self) {
        self.rows_dropped += 1;
    }

    /// Record a row rejected because its temporal key is already stored.
    pub fn record_conflict(&mut self) {
        self.conflicts += 1;
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn rows_dropped(&self) -> u64 {
        self.rows_dropped
    }

    pub fn conflicts(&self) -> u64 {
        self.conflicts
    }

    /// Wall-clock time of the most recent successful insert.
    pub fn last_write_at(&self) -> Option<DateTime<Utc>> {
        self.last_write_at
    }

    pub fn since_last_write(&self) -> Duration {
        self.last_write.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats() {
        let stats = WriteStats::new();
        assert_eq!(stats.rows_written(), 0);
        assert!(stats.last_write_at().is_none());
        assert!(stats.since_last_write() < Duration::from_secs(5));
    }

    #[test]
    fn test_record_write() {
        let mut stats = WriteStats::new();
        stats.record_write();
        stats.record_write();
        assert_eq!(stats.rows_written(), 2);
        assert!(stats.last_write_at().is_some());
    }

    #[test]
    fn test_drop_and_conflict_do_not_count_as_writes() {
        let mut stats = WriteStats::new();
        stats.record_dropped();
        stats.record_conflict();
        assert_eq!(stats.rows_written(), 0);
        assert_eq!(stats.rows_dropped(), 1);
        assert_eq!(stats.conflicts(), 1);
        assert!(stats.last_write_at().is_none());
    }
}
