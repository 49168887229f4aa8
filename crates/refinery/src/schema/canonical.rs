//! The canonical schema every output must satisfy.

use serde::Serialize;

use super::types::ColumnType;

/// A required column and its expected type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CanonicalColumn {
    pub name: &'static str,
    pub expected: ColumnType,
}

impl CanonicalColumn {
    const fn new(name: &'static str, expected: ColumnType) -> Self {
        Self { name, expected }
    }
}

const INTRADAY: &[CanonicalColumn] = &[
    CanonicalColumn::new("ID", ColumnType::Integer),
    CanonicalColumn::new("TimeStamp", ColumnType::Text),
    CanonicalColumn::new("/ES", ColumnType::Float),
    CanonicalColumn::new("/NQ", ColumnType::Float),
    CanonicalColumn::new("/RTY", ColumnType::Float),
    CanonicalColumn::new("SPY", ColumnType::Float),
    CanonicalColumn::new("QQQ", ColumnType::Float),
    CanonicalColumn::new("IWM", ColumnType::Float),
];

/// Ordered, immutable list of required columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalSchema {
    columns: &'static [CanonicalColumn],
}

impl CanonicalSchema {
    /// Intraday price schema: an integer ID, a text timestamp and six
    /// float price columns.
    pub const fn intraday() -> Self {
        Self { columns: INTRADAY }
    }

    /// Columns in declared order.
    pub fn columns(&self) -> &'static [CanonicalColumn] {
        self.columns
    }

    /// Column names in declared order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    /// Number of canonical columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Expected type of a canonical column.
    pub fn expected_type(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.expected)
    }

    /// Declared position of a canonical column.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }
}

impl Default for CanonicalSchema {
    fn default() -> Self {
        Self::intraday()
    }
}
