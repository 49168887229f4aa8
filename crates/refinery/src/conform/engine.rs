//! Detect, repair, re-verify and coerce one table.

use tracing::{debug, warn};

use super::anomaly::{detect, missing_columns, SchemaAnomaly};
use super::coerce::TypeCoercer;
use super::repair::StructuralRepairer;
use crate::audit::{AuditTrail, Issue, Origin, Stage};
use crate::error::{RefineryError, Result};
use crate::input::DataTable;
use crate::schema::CanonicalSchema;

/// A table that satisfies the canonical schema.
#[derive(Debug, Clone)]
pub struct Conformed {
    /// Exactly the canonical columns, in canonical order and type.
    pub table: DataTable,
    /// What the detector found on the table as loaded.
    pub anomaly: SchemaAnomaly,
}

/// Runs the conformance steps for one table at a time.
#[derive(Debug, Clone)]
pub struct ConformanceEngine {
    schema: CanonicalSchema,
    repairer: StructuralRepairer,
    coercer: TypeCoercer,
}

impl ConformanceEngine {
    /// Engine for the given schema, splitting collapsed rows on tabs.
    pub fn new(schema: CanonicalSchema) -> Self {
        Self {
            schema,
            repairer: StructuralRepairer::new(schema),
            coercer: TypeCoercer::new(schema),
        }
    }

    /// Delimiter used to split collapsed columns.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.repairer = self.repairer.with_delimiter(delimiter);
        self
    }

    pub fn schema(&self) -> &CanonicalSchema {
        &self.schema
    }

    /// Bring `table` to the canonical schema.
    ///
    /// Appends one structural and one type record to `trail`. On failure a
    /// `non_conforming / skipped` record naming the failed step is appended
    /// instead of the missing ones, and the error is returned.
    pub fn conform(
        &self,
        table: DataTable,
        origin: &Origin,
        trail: &mut AuditTrail,
    ) -> Result<Conformed> {
        let anomaly = detect(&table, &self.schema);
        debug!(file = origin.file(), anomaly = anomaly.label(), "detected");

        let (table, record) = self
            .repairer
            .repair(table, &anomaly, origin)
            .map_err(|e| fail(trail, origin, Stage::ColExistence, Issue::ColExistenceUnresolved, e))?;
        trail.push(record);

        let missing = missing_columns(&table, &self.schema);
        if !missing.is_empty() {
            let err = RefineryError::SchemaNotConverged { missing };
            return Err(fail(
                trail,
                origin,
                Stage::ColExistence,
                Issue::ColExistenceUnresolved,
                err,
            ));
        }

        let table = table
            .select(self.schema.names())
            .map_err(|e| fail(trail, origin, Stage::ColExistence, Issue::ColExistenceUnresolved, e))?;

        let (table, record) = self
            .coercer
            .coerce(table, origin)
            .map_err(|e| fail(trail, origin, Stage::ColType, Issue::ColTypeUnresolved, e))?;
        trail.push(record);

        Ok(Conformed { table, anomaly })
    }
}

impl Default for ConformanceEngine {
    fn default() -> Self {
        Self::new(CanonicalSchema::intraday())
    }
}

fn fail(
    trail: &mut AuditTrail,
    origin: &Origin,
    stage: Stage,
    issue: Issue,
    err: RefineryError,
) -> RefineryError {
    warn!(file = origin.file(), step = stage.label(), error = %err, "conformance failed");
    trail.push(origin.failed(stage, issue, err.to_string()));
    err
}
