//! The append-only audit trail for one batch run.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::record::{Action, ConformanceRecord, Status};
use crate::error::{RefineryError, Result};

/// Ordered records accumulated over one batch run.
///
/// Serialized as a bare JSON array of records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditTrail {
    records: Vec<ConformanceRecord>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record.
    pub fn push(&mut self, record: ConformanceRecord) {
        self.records.push(record);
    }

    /// Append records from one file, keeping their order.
    pub fn extend(&mut self, records: impl IntoIterator<Item = ConformanceRecord>) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[ConformanceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records for one file, in order.
    pub fn for_file<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a ConformanceRecord> {
        self.records.iter().filter(move |r| r.file() == file)
    }

    /// Number of records with a non-conforming status.
    pub fn non_conforming(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.status() == Status::NonConforming)
            .count()
    }

    /// Number of records with the given action.
    pub fn count_action(&self, action: Action) -> usize {
        self.records.iter().filter(|r| r.action() == action).count()
    }

    /// Write the trail as a pretty JSON array.
    ///
    /// The document is staged next to the destination and renamed into
    /// place, so readers never observe a partial file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    RefineryError::Persistence(format!(
                        "Failed to create directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let temp_path = staging_path(path);
        let file = File::create(&temp_path).map_err(|e| {
            RefineryError::Persistence(format!(
                "Failed to create file '{}': {}",
                temp_path.display(),
                e
            ))
        })?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|e| {
            RefineryError::Persistence(format!("Failed to serialize audit trail: {}", e))
        })?;
        writer
            .flush()
            .map_err(|e| RefineryError::io(&temp_path, e))?;
        drop(writer);

        fs::rename(&temp_path, path).map_err(|e| {
            RefineryError::Persistence(format!(
                "Failed to rename {} -> {}: {}",
                temp_path.display(),
                path.display(),
                e
            ))
        })?;

        info!(path = %path.display(), records = self.len(), "saved audit trail");
        Ok(())
    }

    /// Load a trail from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path).map_err(|e| {
            RefineryError::Persistence(format!("Failed to open file '{}': {}", path.display(), e))
        })?;

        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            RefineryError::Persistence(format!(
                "Failed to parse audit trail '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

impl IntoIterator for AuditTrail {
    type Item = ConformanceRecord;
    type IntoIter = std::vec::IntoIter<ConformanceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Hidden sibling used while writing: `dir/.name.tmp`.
pub(crate) fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{Issue, Origin, Stage};
    use tempfile::tempdir;

    fn sample_trail() -> AuditTrail {
        let origin = Origin::new(Path::new("in/a.parquet"), "silver", "clean");
        let mut trail = AuditTrail::new();
        trail.push(origin.processed(Stage::ColExistence, ""));
        trail.push(origin.adjusted(Stage::ColType, Issue::ColTypeMismatch, "SPY: text -> float"));
        trail
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metadata").join("cleaning_metadata.json");

        let trail = sample_trail();
        trail.save(&path).unwrap();

        assert!(path.exists());
        assert!(!staging_path(&path).exists());

        let loaded = AuditTrail::load(&path).unwrap();
        assert_eq!(loaded, trail);
    }

    #[test]
    fn test_serializes_as_array() {
        let value = serde_json::to_value(sample_trail()).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array[1]["issue"], "col_type_mismatch");
    }

    #[test]
    fn test_counts() {
        let trail = sample_trail();
        assert_eq!(trail.non_conforming(), 1);
        assert_eq!(trail.count_action(Action::Processed), 1);
        assert_eq!(trail.for_file("in/a.parquet").count(), 2);
        assert_eq!(trail.for_file("other").count(), 0);
    }

    #[test]
    fn test_staging_path() {
        assert_eq!(
            staging_path(Path::new("out/a_cleaning.parquet")),
            PathBuf::from("out/.a_cleaning.parquet.tmp")
        );
    }
}
