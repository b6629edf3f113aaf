//! Snapshot cells to typed records.

use tablewatch_protocols::{FieldValue, Record, RecordSchema, RecordSet};
use tracing::debug;

use crate::date::DateNormalizer;
use crate::error::ProjectError;
use crate::extractor::TableSnapshot;

/// Projects a [`TableSnapshot`] onto the record schema.
#[derive(Debug, Clone)]
pub struct FieldProjector {
    schema: RecordSchema,
    row_label_column: String,
    normalizer: DateNormalizer,
}

impl FieldProjector {
    pub fn new(
        schema: RecordSchema,
        row_label_column: impl Into<String>,
        normalizer: DateNormalizer,
    ) -> Self {
        Self {
            schema,
            row_label_column: row_label_column.into(),
            normalizer,
        }
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// One record per target, in schema order.
    pub fn project(&self, snapshot: &TableSnapshot) -> Result<RecordSet, ProjectError> {
        let temporal = self.schema.temporal_field();
        let mut records = Vec::with_capacity(self.schema.len());

        for target in self.schema.targets() {
            let mut fields = Vec::with_capacity(target.fields.len());
            for mapping in &target.fields {
                let raw = snapshot.cell(&self.row_label_column, &mapping.row, &mapping.column)?;
                let value = if mapping.name == temporal {
                    match self.normalizer.normalize(raw)? {
                        Some(ts) => FieldValue::Timestamp(ts),
                        None => FieldValue::Null,
                    }
                } else {
                    FieldValue::Number(parse_number(raw).ok_or_else(|| {
                        ProjectError::InvalidNumber {
                            target: target.name.clone(),
                            field: mapping.name.clone(),
                            value: raw.to_string(),
                        }
                    })?)
                };
                fields.push((mapping.name.clone(), value));
            }

            let record = Record::new(target.name.clone(), fields);
            debug!(record = %record, "Projected");
            records.push(record);
        }

        Ok(records)
    }
}

/// Parse a number with `,` grouping separators. Non-finite values are
/// rejected.
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}
