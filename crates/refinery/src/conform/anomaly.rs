//! Structural anomaly detection.

use serde::Serialize;

use crate::audit::Issue;
use crate::input::DataTable;
use crate::schema::CanonicalSchema;

/// Structural state of a table relative to the canonical schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaAnomaly {
    /// Every canonical column is present by name.
    None,
    /// Several columns, but canonical names are missing: the real header
    /// row was read as data, or never existed.
    MissingHeader { missing: Vec<String> },
    /// A single column: the whole row was read as one field because the
    /// file was exported with a different delimiter.
    DelimiterCollapsed { column: String },
}

impl SchemaAnomaly {
    /// Decision rule, applied only once a canonical column is known to be
    /// missing:
    ///
    /// | columns in table | classification         |
    /// |------------------|------------------------|
    /// | more than one    | `MissingHeader`        |
    /// | one or none      | `DelimiterCollapsed`   |
    ///
    /// This is a coarse proxy. Any multi-column table with a missing name is
    /// assumed to be the header-shift case; new anomaly kinds should get
    /// their own arm here rather than widening the column-count test.
    pub fn classify(table: &DataTable, missing: Vec<String>) -> Self {
        if missing.is_empty() {
            return SchemaAnomaly::None;
        }

        if table.column_count() > 1 {
            SchemaAnomaly::MissingHeader { missing }
        } else {
            SchemaAnomaly::DelimiterCollapsed {
                column: table
                    .column_names()
                    .first()
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
            }
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, SchemaAnomaly::None)
    }

    /// Issue code recorded when this anomaly is repaired.
    pub fn issue(&self) -> Issue {
        match self {
            SchemaAnomaly::None => Issue::NotApplicable,
            SchemaAnomaly::MissingHeader { .. } => Issue::ColExistenceShift,
            SchemaAnomaly::DelimiterCollapsed { .. } => Issue::ColExistenceDelimiter,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SchemaAnomaly::None => "none",
            SchemaAnomaly::MissingHeader { .. } => "missing_header",
            SchemaAnomaly::DelimiterCollapsed { .. } => "delimiter_collapsed",
        }
    }
}

/// Canonical column names the table does not have, in canonical order.
pub fn missing_columns(table: &DataTable, schema: &CanonicalSchema) -> Vec<String> {
    schema
        .names()
        .filter(|name| !table.has_column(name))
        .map(str::to_string)
        .collect()
}

/// Classify a table against the canonical schema.
pub fn detect(table: &DataTable, schema: &CanonicalSchema) -> SchemaAnomaly {
    SchemaAnomaly::classify(table, missing_columns(table, schema))
}
