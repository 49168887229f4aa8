//! CLI command implementations.

pub mod audit;
pub mod clean;
pub mod inspect;
