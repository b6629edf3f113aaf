//! Typed per-cycle records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::TargetDefinition;

/// A single typed field value.
///
/// `Null` only appears for the temporal field ("no time recorded this
/// cycle") or for a target whose storage table is still empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Timestamp(DateTime<Utc>),
    Number(f64),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

/// One target's materialised values for one cycle.
///
/// Equality is structural: same table and identical (field, value) pairs in
/// the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub table: String,
    pub fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new(table: impl Into<String>, fields: Vec<(String, FieldValue)>) -> Self {
        Self {
            table: table.into(),
            fields,
        }
    }

    /// A record for `target` with every value `Null`.
    pub fn empty(target: &TargetDefinition) -> Self {
        Self {
            table: target.name.clone(),
            fields: target
                .field_names()
                .map(|name| (name.to_string(), FieldValue::Null))
                .collect(),
        }
    }

    /// The temporal field's value; it is always the first field.
    pub fn temporal(&self) -> Option<DateTime<Utc>> {
        self.fields.first().and_then(|(_, v)| v.as_timestamp())
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v)
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [", self.table)?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, "]")
    }
}

/// All records of one cycle, in schema order.
pub type RecordSet = Vec<Record>;
