//! Property-based tests for the conformance engine.
//!
//! These check invariants that must hold for any input:
//! 1. **No panics**: detection and repair never crash
//! 2. **Schema invariant**: a successful conform yields exactly the canonical
//!    columns with their expected types
//! 3. **Casting**: numeric text always survives a cast to float
//!
//! ```bash
//! PROPTEST_CASES=10000 cargo test -p refinery --test property_tests
//! ```

use std::path::Path;

use proptest::prelude::*;

use refinery::conform::cast_column;
use refinery::{
    detect, AuditTrail, CanonicalSchema, ColumnData, ColumnType, ConformanceEngine, DataTable,
    Origin,
};

// =============================================================================
// Test Strategies
// =============================================================================

/// One price row: id, timestamp and six prices.
fn price_row() -> impl Strategy<Value = (i64, String, Vec<f64>)> {
    (
        0i64..1_000_000,
        "2025-0[1-9]-[12][0-9] [01][0-9]:[0-5][0-9]",
        prop::collection::vec(0.01f64..100_000.0, 6),
    )
}

fn column_name() -> impl Strategy<Value = String> {
    "[A-Za-z/ ]{1,12}"
}

fn origin() -> Origin {
    Origin::new(Path::new("prop.csv"), "silver", "clean")
}

fn collapsed_table(rows: &[(i64, String, Vec<f64>)]) -> DataTable {
    let header: Vec<&str> = CanonicalSchema::intraday().names().collect();
    let lines = rows
        .iter()
        .map(|(id, ts, prices)| {
            let mut fields = vec![id.to_string(), ts.clone()];
            fields.extend(prices.iter().map(|p| p.to_string()));
            Some(fields.join("\t"))
        })
        .collect();
    DataTable::new(vec![(header.join("\t"), ColumnData::Text(lines))]).unwrap()
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn detect_never_panics(names in prop::collection::hash_set(column_name(), 0..12)) {
        let columns = names
            .into_iter()
            .map(|n| (n, ColumnData::Integer(vec![Some(1)])))
            .collect();
        let table = DataTable::new(columns).unwrap();
        let _ = detect(&table, &CanonicalSchema::intraday());
    }

    #[test]
    fn collapsed_rows_conform(rows in prop::collection::vec(price_row(), 1..20)) {
        let table = collapsed_table(&rows);
        let mut trail = AuditTrail::new();

        let conformed = ConformanceEngine::default()
            .conform(table, &origin(), &mut trail)
            .unwrap();

        let schema = CanonicalSchema::intraday();
        let expected: Vec<&str> = schema.names().collect();
        prop_assert_eq!(conformed.table.column_names(), expected);
        for column in schema.columns() {
            prop_assert_eq!(conformed.table.column_type(column.name), Some(column.expected));
        }
        prop_assert_eq!(conformed.table.row_count(), rows.len());
        prop_assert_eq!(trail.len(), 2);

        let ids: Vec<Option<i64>> = rows.iter().map(|(id, _, _)| Some(*id)).collect();
        prop_assert_eq!(conformed.table.column("ID"), Some(&ColumnData::Integer(ids)));
    }

    #[test]
    fn numeric_text_casts_to_float(values in prop::collection::vec(-1e12f64..1e12, 1..50)) {
        let text = ColumnData::Text(values.iter().map(|v| Some(v.to_string())).collect());
        let cast = cast_column("SPY", text, ColumnType::Float).unwrap();
        let expected = ColumnData::Float(values.into_iter().map(Some).collect());
        prop_assert_eq!(cast, expected);
    }

    #[test]
    fn alphabetic_text_never_casts_to_float(word in "[g-zG-Z]{1,10}") {
        prop_assume!(!["nan", "na", "null", "none", "inf", "infinity"]
            .contains(&word.to_lowercase().as_str()));
        let text = ColumnData::Text(vec![Some(word)]);
        prop_assert!(cast_column("SPY", text, ColumnType::Float).is_err());
    }
}
