//! Catalog serialization for reporting consumers.
//!
//! This module handles the serialized interchange form of an analysis
//! run: the versioned JSON catalog schema and its writer/reader.

pub mod json;
pub mod schema;

// Re-export main types and functions
pub use json::{read_catalog, write_catalog};
pub use schema::{build_catalog, AnalysisSummary, Catalog, CommandRecord};
