//! cf-core: stable foundation for condenserflow.
//!
//! Contains:
//! - strategy (calculation strategy identifiers)
//! - registry (per-strategy parameter schema table)
//! - numeric (lossy number parsing + display formatting)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod registry;
pub mod strategy;

pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use registry::{
    FieldKind, FieldSpec, STRATEGY_TABLE, StrategyEntry, field_spec, fields_for, fields_for_name,
    result_key_for,
};
pub use strategy::StrategyId;
