//! Type coercion to the canonical column types.

use tracing::debug;

use crate::audit::{ConformanceRecord, Issue, Origin, Stage};
use crate::error::{RefineryError, Result};
use crate::input::{format_float, is_null_value, ColumnData, DataTable};
use crate::schema::{CanonicalSchema, ColumnType};

/// Largest magnitude at which every whole f64 maps exactly onto an i64.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Forces every canonical column to its expected type.
#[derive(Debug, Clone)]
pub struct TypeCoercer {
    schema: CanonicalSchema,
}

impl TypeCoercer {
    pub fn new(schema: CanonicalSchema) -> Self {
        Self { schema }
    }

    /// Cast mismatched canonical columns and record whether any needed it.
    ///
    /// Non-canonical columns pass through untouched. A cell that cannot be
    /// represented in the expected type fails the whole table.
    pub fn coerce(
        &self,
        table: DataTable,
        origin: &Origin,
    ) -> Result<(DataTable, ConformanceRecord)> {
        let mut adjusted = Vec::new();
        let mut columns = Vec::with_capacity(table.column_count());

        for (name, data) in table.into_columns() {
            let Some(expected) = self.schema.expected_type(&name) else {
                columns.push((name, data));
                continue;
            };

            let observed = data.column_type();
            if observed == expected {
                columns.push((name, data));
                continue;
            }

            debug!(column = %name, from = %observed, to = %expected, "casting column");
            let cast = cast_column(&name, data, expected)?;

            let found = cast.column_type();
            if found != expected {
                return Err(RefineryError::TypeNotConverged {
                    column: name,
                    expected,
                    found,
                });
            }

            adjusted.push(format!("{}: {} -> {}", name, observed, expected));
            columns.push((name, cast));
        }

        let table = DataTable::new(columns)?;
        let record = if adjusted.is_empty() {
            origin.processed(Stage::ColType, "")
        } else {
            origin.adjusted(Stage::ColType, Issue::ColTypeMismatch, adjusted.join("; "))
        };

        Ok((table, record))
    }
}

/// Cast one column to `target`. Nulls stay null.
pub fn cast_column(name: &str, data: ColumnData, target: ColumnType) -> Result<ColumnData> {
    match target {
        ColumnType::Text => Ok(ColumnData::Text(data.into_text())),
        ColumnType::Float => to_float(name, data),
        ColumnType::Integer => to_integer(name, data),
    }
}

fn coercion_error(name: &str, target: ColumnType, row: usize, value: impl Into<String>) -> RefineryError {
    RefineryError::Coercion {
        column: name.to_string(),
        target,
        row,
        value: value.into(),
    }
}

fn to_float(name: &str, data: ColumnData) -> Result<ColumnData> {
    match data {
        ColumnData::Float(values) => Ok(ColumnData::Float(values)),
        ColumnData::Integer(values) => Ok(ColumnData::Float(
            values.into_iter().map(|v| v.map(|n| n as f64)).collect(),
        )),
        ColumnData::Text(values) => values
            .into_iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                None => Ok(None),
                Some(text) if is_null_value(&text) => Ok(None),
                Some(text) => text
                    .trim()
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| coercion_error(name, ColumnType::Float, row, text)),
            })
            .collect::<Result<Vec<_>>>()
            .map(ColumnData::Float),
    }
}

fn to_integer(name: &str, data: ColumnData) -> Result<ColumnData> {
    match data {
        ColumnData::Integer(values) => Ok(ColumnData::Integer(values)),
        ColumnData::Float(values) => values
            .into_iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                None => Ok(None),
                Some(v) => whole_number(v)
                    .map(Some)
                    .ok_or_else(|| coercion_error(name, ColumnType::Integer, row, format_float(v))),
            })
            .collect::<Result<Vec<_>>>()
            .map(ColumnData::Integer),
        ColumnData::Text(values) => values
            .into_iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                None => Ok(None),
                Some(text) if is_null_value(&text) => Ok(None),
                Some(text) => parse_integer(&text)
                    .map(Some)
                    .ok_or_else(|| coercion_error(name, ColumnType::Integer, row, text)),
            })
            .collect::<Result<Vec<_>>>()
            .map(ColumnData::Integer),
    }
}

/// Accepts plain integers and whole-valued decimals such as "3.0".
fn parse_integer(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().and_then(whole_number))
}

fn whole_number(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_EXACT_INTEGER {
        Some(value as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{Action, Status};
    use std::path::Path;

    fn origin() -> Origin {
        Origin::new(Path::new("in/week.csv"), "silver", "clean")
    }

    fn text(values: &[&str]) -> ColumnData {
        ColumnData::Text(values.iter().map(|v| Some(v.to_string())).collect())
    }

    fn canonical_text_table(row: [&str; 8]) -> DataTable {
        DataTable::new(
            CanonicalSchema::intraday()
                .names()
                .zip(row)
                .map(|(name, value)| (name.to_string(), text(&[value])))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_text_to_float() {
        let cast = cast_column("SPY", text(&["3.14", " 2 ", ""]), ColumnType::Float).unwrap();
        assert_eq!(cast, ColumnData::Float(vec![Some(3.14), Some(2.0), None]));
    }

    #[test]
    fn test_non_numeric_float_fails() {
        let err = cast_column("SPY", text(&["1.0", "abc"]), ColumnType::Float).unwrap_err();
        match err {
            RefineryError::Coercion {
                column,
                target,
                row,
                value,
            } => {
                assert_eq!(column, "SPY");
                assert_eq!(target, ColumnType::Float);
                assert_eq!(row, 1);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_integer_rejects_fractions() {
        let err = cast_column("ID", ColumnData::Float(vec![Some(1.0), Some(1.5)]), ColumnType::Integer)
            .unwrap_err();
        assert!(err.is_fatal_schema());

        assert!(cast_column("ID", text(&["2.5"]), ColumnType::Integer).is_err());
        assert!(cast_column("ID", text(&["x1"]), ColumnType::Integer).is_err());
    }

    #[test]
    fn test_integer_accepts_whole_values() {
        let cast = cast_column("ID", text(&["7", "3.0", "NA"]), ColumnType::Integer).unwrap();
        assert_eq!(cast, ColumnData::Integer(vec![Some(7), Some(3), None]));

        let cast =
            cast_column("ID", ColumnData::Float(vec![Some(4.0), None]), ColumnType::Integer).unwrap();
        assert_eq!(cast, ColumnData::Integer(vec![Some(4), None]));
    }

    #[test]
    fn test_to_text_is_lossless() {
        let cast = cast_column(
            "TimeStamp",
            ColumnData::Float(vec![Some(2.0), Some(0.25), None]),
            ColumnType::Text,
        )
        .unwrap();
        assert_eq!(
            cast,
            ColumnData::Text(vec![Some("2.0".to_string()), Some("0.25".to_string()), None])
        );
    }

    #[test]
    fn test_coerce_records_adjustment_then_conforms() {
        let coercer = TypeCoercer::new(CanonicalSchema::intraday());
        let table = canonical_text_table(["1", "t", "3.14", "3.0", "4.0", "5.0", "6.0", "7.0"]);

        let (table, record) = coercer.coerce(table, &origin()).unwrap();
        assert_eq!(record.status(), Status::NonConforming);
        assert_eq!(record.issue(), Issue::ColTypeMismatch);
        assert_eq!(record.action(), Action::Adjusted);
        assert!(record.notes().contains("ID: text -> integer"));
        assert!(!record.notes().contains("TimeStamp"));
        assert_eq!(table.column("/ES"), Some(&ColumnData::Float(vec![Some(3.14)])));

        let (_, again) = coercer.coerce(table, &origin()).unwrap();
        assert_eq!(again.status(), Status::Conforming);
        assert_eq!(again.issue(), Issue::NotApplicable);
    }

    #[test]
    fn test_coerce_fails_on_non_numeric_price() {
        let coercer = TypeCoercer::new(CanonicalSchema::intraday());
        let table = canonical_text_table(["1", "t", "abc", "3.0", "4.0", "5.0", "6.0", "7.0"]);

        let err = coercer.coerce(table, &origin()).unwrap_err();
        assert!(matches!(err, RefineryError::Coercion { ref column, .. } if column == "/ES"));
    }
}
