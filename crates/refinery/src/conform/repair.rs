//! Structural repair strategies.

use tracing::debug;

use super::anomaly::SchemaAnomaly;
use crate::audit::{ConformanceRecord, Origin, Stage};
use crate::error::{RefineryError, Result};
use crate::input::{is_null_value, ColumnData, DataTable};
use crate::schema::CanonicalSchema;

/// Default delimiter of collapsed exports.
pub const DEFAULT_COLLAPSED_DELIMITER: char = '\t';

/// Rewrites a table's shape into the canonical column set.
#[derive(Debug, Clone)]
pub struct StructuralRepairer {
    schema: CanonicalSchema,
    delimiter: char,
}

impl StructuralRepairer {
    pub fn new(schema: CanonicalSchema) -> Self {
        Self {
            schema,
            delimiter: DEFAULT_COLLAPSED_DELIMITER,
        }
    }

    /// Delimiter used to split collapsed columns.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Apply the strategy for `anomaly` and describe what was done.
    ///
    /// Errors only when a strategy's precondition does not hold; a repair
    /// that runs but still leaves names missing is caught by re-verification.
    pub fn repair(
        &self,
        table: DataTable,
        anomaly: &SchemaAnomaly,
        origin: &Origin,
    ) -> Result<(DataTable, ConformanceRecord)> {
        match anomaly {
            SchemaAnomaly::None => {
                let extras: Vec<&str> = table
                    .column_names()
                    .into_iter()
                    .filter(|name| !self.schema.contains(name))
                    .collect();
                let notes = if extras.is_empty() {
                    String::new()
                } else {
                    format!("non-canonical columns dropped: {}", extras.join(", "))
                };
                let record = origin.processed(Stage::ColExistence, notes);
                Ok((table, record))
            }
            SchemaAnomaly::MissingHeader { .. } => {
                let repaired = self.shift_header(table)?;
                let record = origin.adjusted(
                    Stage::ColExistence,
                    anomaly.issue(),
                    format!(
                        "header restored as first data row; {} columns renamed positionally",
                        repaired.column_count()
                    ),
                );
                Ok((repaired, record))
            }
            SchemaAnomaly::DelimiterCollapsed { column } => {
                let repaired = self.split_collapsed(table, column)?;
                let record = origin.adjusted(
                    Stage::ColExistence,
                    anomaly.issue(),
                    format!(
                        "collapsed column split on {:?} into {} columns",
                        self.delimiter,
                        repaired.column_count()
                    ),
                );
                Ok((repaired, record))
            }
        }
    }

    /// Push the current header down as the first data row and rename the
    /// columns to the canonical names by position.
    ///
    /// The restored row uses the header cells as read from the source when
    /// the table has them, so suffixed duplicates and null tokens come back
    /// as the original text.
    ///
    /// Matching is purely positional: a source whose physical column order
    /// differs from the canonical order is silently mismapped. The column
    /// count is the only precondition that can be checked.
    pub fn shift_header(&self, table: DataTable) -> Result<DataTable> {
        if table.column_count() != self.schema.len() {
            return Err(RefineryError::ColumnCountMismatch {
                expected: self.schema.len(),
                found: table.column_count(),
            });
        }

        let source_headers = table.source_headers().map(<[String]>::to_vec);
        let columns = table
            .into_columns()
            .zip(self.schema.names())
            .enumerate()
            .map(|(idx, ((old_name, data), canonical))| {
                debug!(from = %old_name, to = canonical, "renaming shifted column");
                let header = source_headers
                    .as_ref()
                    .and_then(|raw| raw.get(idx).cloned())
                    .unwrap_or(old_name);
                let mut cells = Vec::with_capacity(data.len() + 1);
                cells.push(if is_null_value(&header) { None } else { Some(header) });
                cells.extend(data.into_text());
                (canonical.to_string(), ColumnData::Text(cells))
            })
            .collect();

        DataTable::new(columns)
    }

    /// Split a single collapsed column into one column per delimited field.
    ///
    /// Header names come from the column name; every row must split into
    /// the same number of fields as the header.
    pub fn split_collapsed(&self, table: DataTable, column: &str) -> Result<DataTable> {
        let data = table
            .into_columns()
            .find(|(name, _)| name == column)
            .map(|(_, data)| data)
            .unwrap_or(ColumnData::Text(Vec::new()));

        let headers: Vec<String> = column
            .split(self.delimiter)
            .map(|h| h.trim().to_string())
            .collect();
        let mut cells: Vec<Vec<Option<String>>> =
            vec![Vec::with_capacity(data.len()); headers.len()];

        for (row, value) in data.into_text().into_iter().enumerate() {
            let Some(value) = value else {
                cells.iter_mut().for_each(|c| c.push(None));
                continue;
            };

            let fields: Vec<&str> = value.split(self.delimiter).collect();
            if fields.len() != headers.len() {
                return Err(RefineryError::RaggedRow {
                    row,
                    expected: headers.len(),
                    found: fields.len(),
                });
            }

            for (col, field) in cells.iter_mut().zip(fields) {
                col.push(if is_null_value(field) {
                    None
                } else {
                    Some(field.to_string())
                });
            }
        }

        DataTable::new(
            headers
                .into_iter()
                .zip(cells)
                .map(|(name, values)| (name, ColumnData::Text(values)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{Action, Issue, Status};
    use crate::conform::detect;
    use std::path::Path;

    fn origin() -> Origin {
        Origin::new(Path::new("in/week.parquet"), "silver", "clean")
    }

    fn repairer() -> StructuralRepairer {
        StructuralRepairer::new(CanonicalSchema::intraday())
    }

    #[test]
    fn test_header_shift_restores_first_row() {
        let names = ["A", "B", "C", "D", "E", "F", "G", "H"];
        let mut columns = vec![
            ("A".to_string(), ColumnData::Integer(vec![Some(1)])),
            ("B".to_string(), ColumnData::Text(vec![Some("t".to_string())])),
        ];
        for (name, value) in names[2..].iter().zip([2.0, 3.0, 4.0, 5.0, 6.0, 7.0]) {
            columns.push((name.to_string(), ColumnData::Float(vec![Some(value)])));
        }
        let table = DataTable::new(columns).unwrap();
        let anomaly = detect(&table, &CanonicalSchema::intraday());

        let (repaired, record) = repairer().repair(table, &anomaly, &origin()).unwrap();

        assert_eq!(
            repaired.column_names(),
            vec!["ID", "TimeStamp", "/ES", "/NQ", "/RTY", "SPY", "QQQ", "IWM"]
        );
        assert_eq!(repaired.row_count(), 2);
        assert_eq!(repaired.row_text(0), names.to_vec());
        assert_eq!(
            repaired.row_text(1),
            vec!["1", "t", "2.0", "3.0", "4.0", "5.0", "6.0", "7.0"]
        );

        assert_eq!(record.status(), Status::NonConforming);
        assert_eq!(record.issue(), Issue::ColExistenceShift);
        assert_eq!(record.action(), Action::Adjusted);
    }

    #[test]
    fn test_header_shift_restores_source_header_cells() {
        let raw = ["1", "t", "", "", "NA", "NA", "7.5", "7.5"];
        let suffixed = ["1", "t", "", ".1", "NA", "NA.1", "7.5", "7.5.1"];
        let table = DataTable::new(
            suffixed
                .iter()
                .map(|name| (name.to_string(), ColumnData::Float(vec![Some(6.0)])))
                .collect(),
        )
        .unwrap()
        .with_source_headers(raw.iter().map(|h| h.to_string()).collect());

        let repaired = repairer().shift_header(table).unwrap();

        assert_eq!(
            repaired.column("/NQ"),
            Some(&ColumnData::Text(vec![None, Some("6.0".to_string())]))
        );
        assert_eq!(
            repaired.column("SPY"),
            Some(&ColumnData::Text(vec![None, Some("6.0".to_string())]))
        );
        assert_eq!(repaired.row_text(0), vec!["1", "t", "", "", "", "", "7.5", "7.5"]);
    }

    #[test]
    fn test_header_shift_requires_exact_column_count() {
        let table = DataTable::new(vec![
            ("A".to_string(), ColumnData::Integer(vec![Some(1)])),
            ("B".to_string(), ColumnData::Integer(vec![Some(2)])),
        ])
        .unwrap();

        let err = repairer().shift_header(table).unwrap_err();
        assert!(matches!(
            err,
            RefineryError::ColumnCountMismatch {
                expected: 8,
                found: 2
            }
        ));
        assert!(err.is_fatal_schema());
    }

    #[test]
    fn test_delimiter_split() {
        let name = "ID\tTimeStamp\t/ES\t/NQ\t/RTY\tSPY\tQQQ\tIWM".to_string();
        let table = DataTable::new(vec![(
            name.clone(),
            ColumnData::Text(vec![Some("1\tt\t2.0\t3.0\t4.0\t5.0\t6.0\t7.0".to_string())]),
        )])
        .unwrap();
        let anomaly = SchemaAnomaly::DelimiterCollapsed { column: name };

        let (repaired, record) = repairer().repair(table, &anomaly, &origin()).unwrap();

        assert_eq!(repaired.column_count(), 8);
        assert!(detect(&repaired, &CanonicalSchema::intraday()).is_none());
        assert_eq!(
            repaired.row_text(0),
            vec!["1", "t", "2.0", "3.0", "4.0", "5.0", "6.0", "7.0"]
        );
        assert_eq!(record.issue(), Issue::ColExistenceDelimiter);
    }

    #[test]
    fn test_delimiter_split_rejects_ragged_rows() {
        let table = DataTable::new(vec![(
            "a\tb".to_string(),
            ColumnData::Text(vec![Some("1\t2".to_string()), Some("3".to_string())]),
        )])
        .unwrap();

        let err = repairer().split_collapsed(table, "a\tb").unwrap_err();
        assert!(matches!(
            err,
            RefineryError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_delimiter_split_short_header_fails_reverification() {
        let table = DataTable::new(vec![(
            "ID\tTimeStamp".to_string(),
            ColumnData::Text(vec![Some("1\tt".to_string())]),
        )])
        .unwrap();

        let repaired = repairer().split_collapsed(table, "ID\tTimeStamp").unwrap();
        assert!(!detect(&repaired, &CanonicalSchema::intraday()).is_none());
    }

    #[test]
    fn test_none_notes_extra_columns() {
        let mut columns: Vec<(String, ColumnData)> = CanonicalSchema::intraday()
            .names()
            .map(|n| (n.to_string(), ColumnData::Float(vec![Some(1.0)])))
            .collect();
        columns.push(("DIA".to_string(), ColumnData::Float(vec![Some(1.0)])));
        let table = DataTable::new(columns).unwrap();

        let (_, record) = repairer()
            .repair(table, &SchemaAnomaly::None, &origin())
            .unwrap();
        assert_eq!(record.status(), Status::Conforming);
        assert_eq!(record.action(), Action::Processed);
        assert!(record.notes().contains("DIA"));
    }
}
