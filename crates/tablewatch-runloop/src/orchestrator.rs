//! The acquisition state machine.

use std::sync::Arc;
use std::time::Duration;

use tablewatch_core::{
    DateNormalizer, FieldProjector, Persister, TableExtractor, WriteStats, diff,
};
use tablewatch_protocols::{PageSource, RecordSet, RecordStore, StoreError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::RunSettings;
use crate::error::RunError;
use crate::progress::ProgressLine;
use crate::recovery::read_with_recovery;
use crate::state::OrchestratorState;

/// Upper bound on session teardown during cleanup.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Totals reported when a run ends by cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub rows_written: u64,
    pub rows_dropped: u64,
    pub conflicts: u64,
    /// Session refreshes, both recovery and rotation.
    pub refreshes: u64,
    /// Rows still in the retry buffer at shutdown, now lost.
    pub unwritten: usize,
    pub uptime: Duration,
}

/// Per-run pipeline built during STARTING.
struct Pipeline {
    extractor: TableExtractor,
    projector: FieldProjector,
}

/// Owns the session, the store and the previous cycle's records for the
/// life of the process.
pub struct Orchestrator {
    settings: RunSettings,
    source: Box<dyn PageSource>,
    store: Arc<dyn RecordStore>,
    persister: Persister,
    cancel: CancellationToken,
    state: OrchestratorState,
    stats: WriteStats,
    previous: RecordSet,
    cycles: u64,
    refreshes: u64,
    refresh_due: bool,
    progress_shown: bool,
    started: Instant,
}

impl Orchestrator {
    pub fn new(
        settings: RunSettings,
        source: Box<dyn PageSource>,
        store: Arc<dyn RecordStore>,
        cancel: CancellationToken,
    ) -> Self {
        let persister = Persister::new(store.clone(), settings.retry_buffer);
        Self {
            settings,
            source,
            store,
            persister,
            cancel,
            state: OrchestratorState::Starting,
            stats: WriteStats::new(),
            previous: Vec::new(),
            cycles: 0,
            refreshes: 0,
            refresh_due: false,
            progress_shown: false,
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn stats(&self) -> &WriteStats {
        &self.stats
    }

    /// The last cycle's records (or the stored rows loaded at startup).
    pub fn previous(&self) -> &RecordSet {
        &self.previous
    }

    /// Run until cancelled or a fatal error. Cleanup always runs, exactly
    /// once, before this returns.
    pub async fn run(&mut self) -> Result<RunSummary, RunError> {
        if self.state != OrchestratorState::Starting {
            return Err(RunError::AlreadyTerminated);
        }
        self.started = Instant::now();
        info!(
            engine = %self.source.kind(),
            store = self.store.id(),
            targets = self.settings.schema.len(),
            "Starting"
        );

        let result = self.drive().await;
        if let Err(e) = &result {
            error!(state = %self.state, error = %e, "Fatal error, shutting down");
        }

        let unwritten = self.cleanup().await;
        result.map(|()| RunSummary {
            cycles: self.cycles,
            rows_written: self.stats.rows_written(),
            rows_dropped: self.stats.rows_dropped(),
            conflicts: self.stats.conflicts(),
            refreshes: self.refreshes,
            unwritten,
            uptime: self.started.elapsed(),
        })
    }

    fn transition(&mut self, next: OrchestratorState) {
        if self.state.can_transition_to(next) {
            debug!(from = %self.state, to = %next, "State transition");
            self.state = next;
        } else {
            warn!(from = %self.state, to = %next, "Ignoring invalid state transition");
        }
    }

    async fn drive(&mut self) -> Result<(), RunError> {
        match self.start().await? {
            Some(pipeline) => {
                self.transition(OrchestratorState::Running);
                self.cycle_loop(&pipeline).await
            }
            None => Ok(()),
        }
    }

    /// STARTING. `Ok(None)` when cancelled before the session is up.
    async fn start(&mut self) -> Result<Option<Pipeline>, RunError> {
        let state = OrchestratorState::Starting;
        let store_err = |source: StoreError| RunError::Store { state, source };

        if self.cancel.is_cancelled() {
            info!("Cancelled before start");
            return Ok(None);
        }

        let extractor = TableExtractor::new(self.settings.table_locator.clone())
            .map_err(|source| RunError::Extract { state, source })?;
        let normalizer =
            DateNormalizer::new(self.settings.timezone.clone(), self.settings.clock.clone());
        let projector = FieldProjector::new(
            self.settings.schema.clone(),
            self.settings.row_label_column.clone(),
            normalizer,
        );

        self.store.connect().await.map_err(store_err)?;
        let temporal = self.settings.schema.temporal_field();
        for target in self.settings.schema.targets() {
            self.store
                .ensure_table(target, temporal)
                .await
                .map_err(store_err)?;
        }

        let cancel = self.cancel.clone();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Cancelled while acquiring session");
                return Ok(None);
            }
            result = self.source.acquire() => {
                result.map_err(|source| RunError::Session { state, source })?;
            }
        }

        let mut previous = Vec::with_capacity(self.settings.schema.len());
        for target in self.settings.schema.targets() {
            let row = self
                .store
                .last_row(target, temporal)
                .await
                .map_err(store_err)?;
            debug!(record = %row, "Last stored row");
            previous.push(row);
        }
        self.previous = previous;

        Ok(Some(Pipeline {
            extractor,
            projector,
        }))
    }

    /// RUNNING. Returns `Ok` only on cancellation.
    async fn cycle_loop(&mut self, pipeline: &Pipeline) -> Result<(), RunError> {
        let state = OrchestratorState::Running;
        let cancel = self.cancel.clone();

        loop {
            if cancel.is_cancelled() {
                info!("Cancellation requested");
                return Ok(());
            }
            let cycle_start = Instant::now();

            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                read = read_with_recovery(self.source.as_mut(), self.settings.read_timeout) => read?,
            };
            if read.refreshed {
                self.refreshes += 1;
            }

            let (snapshot, profile) = pipeline
                .extractor
                .extract_profiled(&read.markup)
                .map_err(|source| RunError::Extract { state, source })?;
            let busy = read.elapsed + profile.parse + profile.build;
            if busy > self.settings.slow_cycle {
                warn!(
                    read_ms = read.elapsed.as_millis() as u64,
                    parse_ms = profile.parse.as_millis() as u64,
                    build_ms = profile.build.as_millis() as u64,
                    "Slow cycle, session will be refreshed"
                );
                self.refresh_due = true;
            }

            let current = pipeline
                .projector
                .project(&snapshot)
                .map_err(|source| RunError::Project { state, source })?;
            let changes = diff(&self.previous, &current);
            let changed = changes.len();
            let outcome = self.persister.persist(changes, &mut self.stats).await;
            debug!(
                changed,
                written = outcome.written,
                skipped = outcome.skipped,
                pending = outcome.pending,
                "Cycle persisted"
            );
            self.previous = current;
            self.cycles += 1;

            let age = self.source.age();
            if self.refresh_due || age > self.settings.lifetime {
                let reason = if self.refresh_due { "slow cycle" } else { "lifetime reached" };
                info!(reason, age_secs = age.as_secs(), "Rotating session");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(()),
                    result = self.source.refresh() => {
                        result.map_err(|source| RunError::Session { state, source })?;
                    }
                }
                self.refreshes += 1;
                self.refresh_due = false;
            }

            let sleep = self.settings.min_cycle.saturating_sub(cycle_start.elapsed());
            if self.settings.progress {
                ProgressLine {
                    rows: self.stats.rows_written(),
                    uptime: self.started.elapsed(),
                    since_write: self.stats.since_last_write(),
                    sleeping: sleep,
                }
                .print();
                self.progress_shown = true;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(sleep) => {}
            }
        }
    }

    /// CLEANING_UP then TERMINATED. Returns the number of buffered rows lost.
    async fn cleanup(&mut self) -> usize {
        if matches!(
            self.state,
            OrchestratorState::CleaningUp | OrchestratorState::Terminated
        ) {
            return 0;
        }
        self.transition(OrchestratorState::CleaningUp);
        if self.progress_shown {
            ProgressLine::finish();
        }

        match tokio::time::timeout(SHUTDOWN_GRACE, self.source.shutdown()).await {
            Ok(Ok(())) => debug!("Session closed"),
            Ok(Err(e)) => warn!(error = %e, "Session shutdown failed"),
            Err(_) => warn!("Session shutdown timed out"),
        }

        let unwritten = self.persister.abandon();
        if let Err(e) = self.store.close().await {
            warn!(error = %e, "Store close failed");
        }

        self.transition(OrchestratorState::Terminated);
        info!(
            cycles = self.cycles,
            rows = self.stats.rows_written(),
            unwritten,
            "Terminated"
        );
        unwritten
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
