//! Static record schema: which cells of the watched table feed which
//! storage tables.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Source timezones the date normalizer can interpret.
pub const SUPPORTED_TIMEZONES: &[&str] = &["GMT", "UTC"];

/// Whether `tz` names a supported source timezone (case-insensitive).
pub fn is_supported_timezone(tz: &str) -> bool {
    SUPPORTED_TIMEZONES
        .iter()
        .any(|supported| supported.eq_ignore_ascii_case(tz.trim()))
}

/// One field of a target: where in the table its value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Field (storage column) name.
    pub name: String,
    /// Label of the source row, looked up in the row-label column.
    pub row: String,
    /// Header of the source column.
    pub column: String,
}

impl FieldMapping {
    pub fn new(
        name: impl Into<String>,
        row: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            row: row.into(),
            column: column.into(),
        }
    }
}

/// One storage table and its ordered field mappings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDefinition {
    pub name: String,
    pub fields: Vec<FieldMapping>,
}

impl TargetDefinition {
    pub fn new(name: impl Into<String>, fields: Vec<FieldMapping>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// The full, validated schema.
///
/// Every target lists the temporal field exactly once, in first position;
/// all remaining fields are numeric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    temporal_field: String,
    targets: Vec<TargetDefinition>,
}

impl RecordSchema {
    /// Build a schema, enforcing the temporal-field invariants.
    pub fn new(
        temporal_field: impl Into<String>,
        targets: Vec<TargetDefinition>,
    ) -> Result<Self, SchemaError> {
        let temporal_field = temporal_field.into();

        if targets.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut seen_targets = HashSet::new();
        for target in &targets {
            if !seen_targets.insert(target.name.as_str()) {
                return Err(SchemaError::DuplicateTarget(target.name.clone()));
            }

            let first = target
                .fields
                .first()
                .ok_or_else(|| SchemaError::NoFields(target.name.clone()))?;
            if first.name != temporal_field {
                return Err(SchemaError::TemporalNotFirst {
                    target: target.name.clone(),
                    field: temporal_field,
                });
            }

            let mut seen_fields = HashSet::new();
            for field in &target.fields {
                if !seen_fields.insert(field.name.as_str()) {
                    if field.name == temporal_field {
                        return Err(SchemaError::TemporalRepeated {
                            target: target.name.clone(),
                            field: temporal_field,
                        });
                    }
                    return Err(SchemaError::DuplicateField {
                        target: target.name.clone(),
                        field: field.name.clone(),
                    });
                }
            }
        }

        Ok(Self {
            temporal_field,
            targets,
        })
    }

    pub fn temporal_field(&self) -> &str {
        &self.temporal_field
    }

    pub fn targets(&self) -> &[TargetDefinition] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
