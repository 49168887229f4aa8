//! Schema conformance: anomaly detection, structural repair and type
//! coercion.

mod anomaly;
mod coerce;
mod engine;
mod repair;

pub use anomaly::{detect, missing_columns, SchemaAnomaly};
pub use coerce::{cast_column, TypeCoercer};
pub use engine::{ConformanceEngine, Conformed};
pub use repair::{StructuralRepairer, DEFAULT_COLLAPSED_DELIMITER};
