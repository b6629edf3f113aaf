//! # tablewatch core
//!
//! The per-cycle data pipeline.
//!
//! ## Components
//!
//! - [`TableExtractor`] - rendered markup to [`TableSnapshot`]
//! - [`DateNormalizer`] - clock-time strings to UTC timestamps
//! - [`FieldProjector`] - snapshot cells to typed records
//! - [`diff`] - records that changed since the previous cycle
//! - [`Persister`] - append-only writes with a bounded retry buffer

pub mod date;
pub mod detector;
pub mod error;
pub mod extractor;
pub mod persister;
pub mod projector;
pub mod stats;

pub use date::{Clock, DateNormalizer, FixedClock, SystemClock};
pub use detector::diff;
pub use error::{ExtractError, ProjectError};
pub use extractor::{ExtractProfile, TableExtractor, TableSnapshot};
pub use persister::{PersistOutcome, Persister};
pub use projector::FieldProjector;
pub use stats::WriteStats;
