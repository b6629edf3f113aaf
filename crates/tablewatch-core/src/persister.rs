//! Append-only persistence of changed records.
//!
//! Rows whose insert fails with a retryable store error are held in a
//! bounded buffer, one FIFO per target, and retried ahead of new changes on
//! every later call. A target that keeps failing is parked for the rest of
//! the call; the others keep draining. A full buffer drops its oldest row.

use std::collections::VecDeque;
use std::sync::Arc;

use tablewatch_protocols::{Record, RecordStore, StoreError};
use tracing::{debug, error, info, warn};

use crate::stats::WriteStats;

/// What one `persist` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistOutcome {
    /// Rows inserted, including previously buffered ones.
    pub written: usize,
    /// Records skipped because their temporal field was null.
    pub skipped: usize,
    /// Rows discarded: key conflicts, rejected statements and buffer overflow.
    pub discarded: usize,
    /// Rows still waiting in the retry buffer.
    pub pending: usize,
}

/// Buffered rows of one target, tagged with their arrival sequence.
#[derive(Debug)]
struct TargetQueue {
    table: String,
    rows: VecDeque<(u64, Record)>,
}

/// How draining one target ended.
enum Drain {
    Done,
    Parked,
    StoreDown,
}

pub struct Persister {
    store: Arc<dyn RecordStore>,
    queues: Vec<TargetQueue>,
    capacity: usize,
    next_seq: u64,
}

impl std::fmt::Debug for Persister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persister")
            .field("store", &self.store.id())
            .field("pending", &self.pending())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl Persister {
    /// `capacity` bounds the retry buffer; 0 disables buffering.
    pub fn new(store: Arc<dyn RecordStore>, capacity: usize) -> Self {
        Self {
            store,
            queues: Vec::new(),
            capacity,
            next_seq: 0,
        }
    }

    /// Rows waiting for a retry.
    pub fn pending(&self) -> usize {
        self.queues.iter().map(|q| q.rows.len()).sum()
    }

    fn enqueue(&mut self, record: Record) {
        let seq = self.next_seq;
        self.next_seq += 1;
        match self.queues.iter_mut().find(|q| q.table == record.table) {
            Some(queue) => queue.rows.push_back((seq, record)),
            None => self.queues.push(TargetQueue {
                table: record.table.clone(),
                rows: VecDeque::from([(seq, record)]),
            }),
        }
    }

    /// Write `changes`, skipping records with a null temporal field.
    ///
    /// Storage failures never escape. A transient failure leaves the row and
    /// the rest of its target's queue buffered for the next call; a rejected
    /// statement drops the row.
    pub async fn persist(&mut self, changes: Vec<Record>, stats: &mut WriteStats) -> PersistOutcome {
        let mut outcome = PersistOutcome::default();

        for record in changes {
            if record.temporal().is_none() {
                debug!(table = %record.table, "No timestamp this cycle, skipping");
                outcome.skipped += 1;
                continue;
            }
            self.enqueue(record);
        }

        let mut reconnected = false;
        for index in 0..self.queues.len() {
            let drain = self
                .drain(index, &mut reconnected, stats, &mut outcome)
                .await;
            match drain {
                Drain::Done => {}
                Drain::Parked => warn!(
                    table = %self.queues[index].table,
                    pending = self.queues[index].rows.len(),
                    "Insert failed after reconnect, buffering"
                ),
                Drain::StoreDown => break,
            }
        }
        self.queues.retain(|q| !q.rows.is_empty());

        while self.pending() > self.capacity {
            if let Some(dropped) = self.pop_oldest() {
                error!(record = %dropped, "Retry buffer full, dropping oldest row");
                stats.record_dropped();
                outcome.discarded += 1;
            }
        }

        outcome.pending = self.pending();
        outcome
    }

    async fn drain(
        &mut self,
        index: usize,
        reconnected: &mut bool,
        stats: &mut WriteStats,
        outcome: &mut PersistOutcome,
    ) -> Drain {
        let store = self.store.clone();
        let queue = &mut self.queues[index];
        while let Some((_, record)) = queue.rows.front() {
            match store.insert(record).await {
                Ok(()) => {
                    debug!(record = %record, "Inserted");
                    stats.record_write();
                    outcome.written += 1;
                    queue.rows.pop_front();
                }
                Err(StoreError::Conflict { table, key }) => {
                    warn!(%table, %key, "Row already stored, discarding");
                    stats.record_conflict();
                    outcome.discarded += 1;
                    queue.rows.pop_front();
                }
                Err(e) if !e.is_retryable() => {
                    error!(error = %e, record = %record, "Insert rejected, dropping row");
                    stats.record_dropped();
                    outcome.discarded += 1;
                    queue.rows.pop_front();
                }
                Err(e) if !*reconnected => {
                    warn!(error = %e, table = %record.table, "Insert failed, reconnecting store");
                    *reconnected = true;
                    if let Err(e) = store.reconnect().await {
                        warn!(error = %e, "Store reconnect failed");
                        return Drain::StoreDown;
                    }
                    info!(store = store.id(), "Store reconnected");
                }
                Err(e) => {
                    debug!(error = %e, table = %record.table, "Insert still failing");
                    return Drain::Parked;
                }
            }
        }
        Drain::Done
    }

    /// Remove the earliest-buffered row across all targets.
    fn pop_oldest(&mut self) -> Option<Record> {
        let queue = self
            .queues
            .iter_mut()
            .filter(|q| !q.rows.is_empty())
            .min_by_key(|q| q.rows.front().map(|(seq, _)| *seq))?;
        let (_, record) = queue.rows.pop_front()?;
        self.queues.retain(|q| !q.rows.is_empty());
        Some(record)
    }

    /// Give up on buffered rows, logging each. Returns how many were lost.
    pub fn abandon(&mut self) -> usize {
        let lost = self.pending();
        for queue in self.queues.drain(..) {
            for (_, record) in queue.rows {
                error!(record = %record, "Unwritten row lost at shutdown");
            }
        }
        lost
    }
}

#[cfg(test)]
#[path = "persister_tests.rs"]
mod tests;
