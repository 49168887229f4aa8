//! Audit records and the per-run audit trail.

mod record;
mod trail;

pub use record::{Action, ConformanceRecord, Issue, Origin, Stage, Status};
pub use trail::AuditTrail;

pub(crate) use trail::staging_path;
