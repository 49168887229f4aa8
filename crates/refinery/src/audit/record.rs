//! Conformance records: one per detection, repair, coercion or write
//! decision for one file.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Whether the file conformed at this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Conforming,
    NonConforming,
}

/// Issue code recorded for a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Issue {
    #[serde(rename = "N/A")]
    NotApplicable,
    /// Header row consumed as data; columns renamed positionally.
    #[serde(rename = "col_existence_shift")]
    ColExistenceShift,
    /// Whole row read as one field; split on the delimiter.
    #[serde(rename = "col_existence_delimiter")]
    ColExistenceDelimiter,
    /// Canonical columns still missing after repair.
    #[serde(rename = "col_existence_unresolved")]
    ColExistenceUnresolved,
    /// At least one column had to be cast.
    #[serde(rename = "col_type_mismatch")]
    ColTypeMismatch,
    /// A column could not be cast to its expected type.
    #[serde(rename = "col_type_unresolved")]
    ColTypeUnresolved,
    /// Read, write or other failure outside the schema checks.
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Issue {
    pub fn code(&self) -> &'static str {
        match self {
            Issue::NotApplicable => "N/A",
            Issue::ColExistenceShift => "col_existence_shift",
            Issue::ColExistenceDelimiter => "col_existence_delimiter",
            Issue::ColExistenceUnresolved => "col_existence_unresolved",
            Issue::ColTypeMismatch => "col_type_mismatch",
            Issue::ColTypeUnresolved => "col_type_unresolved",
            Issue::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// What was done with the file at this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Processed,
    Adjusted,
    Skipped,
}

/// Pipeline step a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Read,
    ColExistence,
    ColType,
    Write,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Read => "read",
            Stage::ColExistence => "col_existence",
            Stage::ColType => "col_type",
            Stage::Write => "write",
        }
    }
}

/// One audit entry. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConformanceRecord {
    file: String,
    layer: String,
    process: String,
    sub_process: String,
    status: Status,
    issue: Issue,
    action: Action,
    notes: String,
}

impl ConformanceRecord {
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn layer(&self) -> &str {
        &self.layer
    }

    pub fn process(&self) -> &str {
        &self.process
    }

    pub fn sub_process(&self) -> &str {
        &self.sub_process
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn issue(&self) -> Issue {
        self.issue
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }
}

/// Where records come from: the file plus the layer and process labels.
///
/// Every record for one file is minted from the same origin.
#[derive(Debug, Clone)]
pub struct Origin {
    file: String,
    layer: String,
    process: String,
}

impl Origin {
    pub fn new(file: &Path, layer: impl Into<String>, process: impl Into<String>) -> Self {
        Self {
            file: file.display().to_string(),
            layer: layer.into(),
            process: process.into(),
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// Build a record with every field explicit.
    pub fn record(
        &self,
        stage: Stage,
        status: Status,
        issue: Issue,
        action: Action,
        notes: impl Into<String>,
    ) -> ConformanceRecord {
        let notes = notes.into();
        ConformanceRecord {
            file: self.file.clone(),
            layer: self.layer.clone(),
            process: self.process.clone(),
            sub_process: stage.label().to_string(),
            status,
            issue,
            action,
            notes: if notes.is_empty() { "N/A".to_string() } else { notes },
        }
    }

    /// Step passed without changes.
    pub fn processed(&self, stage: Stage, notes: impl Into<String>) -> ConformanceRecord {
        self.record(
            stage,
            Status::Conforming,
            Issue::NotApplicable,
            Action::Processed,
            notes,
        )
    }

    /// Step found an issue and repaired it.
    pub fn adjusted(&self, stage: Stage, issue: Issue, notes: impl Into<String>) -> ConformanceRecord {
        self.record(stage, Status::NonConforming, issue, Action::Adjusted, notes)
    }

    /// Step gave up on the file.
    pub fn failed(&self, stage: Stage, issue: Issue, notes: impl Into<String>) -> ConformanceRecord {
        self.record(stage, Status::NonConforming, issue, Action::Skipped, notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_wire_format() {
        let origin = Origin::new(Path::new("data/a.parquet"), "silver", "clean");
        let record = origin.adjusted(Stage::ColExistence, Issue::ColExistenceShift, "");

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "file": "data/a.parquet",
                "layer": "silver",
                "process": "clean",
                "sub_process": "col_existence",
                "status": "non_conforming",
                "issue": "col_existence_shift",
                "action": "adjusted",
                "notes": "N/A",
            })
        );
    }

    #[test]
    fn test_processed_uses_not_applicable() {
        let origin = Origin::new(Path::new("a.csv"), "silver", "clean");
        let record = origin.processed(Stage::ColType, "all columns typed");

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], "conforming");
        assert_eq!(value["issue"], "N/A");
        assert_eq!(value["action"], "processed");
        assert_eq!(record.notes(), "all columns typed");
    }

    #[test]
    fn test_issue_codes_match_serde() {
        for issue in [
            Issue::NotApplicable,
            Issue::ColExistenceShift,
            Issue::ColExistenceDelimiter,
            Issue::ColExistenceUnresolved,
            Issue::ColTypeMismatch,
            Issue::ColTypeUnresolved,
            Issue::Unknown,
        ] {
            assert_eq!(serde_json::to_value(issue).unwrap(), issue.code());
        }
    }
}
