//! shaper - include-driven object graph projection
//!
//! This is a convenience crate that re-exports the main functionality
//! from the shaper crates for benchmarking and integration.

pub use shaper_core::{self, Expander, IncludeSet, MappingDefinition, Registry, Value, sort};
pub use shaper_error::*;
