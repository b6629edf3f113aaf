//! Change detection between consecutive cycles.

use tablewatch_protocols::Record;

/// Records of `current` that have no structurally equal record in
/// `previous`, in `current` order. A record with any changed field is
/// returned whole.
pub fn diff(previous: &[Record], current: &[Record]) -> Vec<Record> {
    current
        .iter()
        .filter(|record| !previous.contains(record))
        .cloned()
        .collect()
}
