//! # tablewatch runloop
//!
//! Drives the acquisition cycle over a [`PageSource`] and a [`RecordStore`]:
//!
//! ```text
//! STARTING -> RUNNING -> CLEANING_UP -> TERMINATED
//! ```
//!
//! Each RUNNING cycle reads the page (with one refresh-and-retry on a
//! recoverable session failure), extracts and projects the table, persists
//! what changed, rotates the session by age and sleeps out the rest of the
//! cycle interval. Cancellation and fatal errors both leave through
//! CLEANING_UP.
//!
//! [`PageSource`]: tablewatch_protocols::PageSource
//! [`RecordStore`]: tablewatch_protocols::RecordStore

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod recovery;
pub mod signal;
pub mod state;

pub use config::RunSettings;
pub use error::RunError;
pub use orchestrator::{Orchestrator, RunSummary};
pub use progress::ProgressLine;
pub use recovery::{ContentRead, read_with_recovery};
pub use signal::install_signal_handlers;
pub use state::OrchestratorState;
// Re-export CancellationToken for convenience
pub use tokio_util::sync::CancellationToken;
