//! Plain HTTP page source.
//!
//! Fetches the configured URL on every read. Suitable for sources whose
//! table is present in the served markup without script execution.

mod source;

pub use source::{HttpPageSource, HttpSourceConfig};
