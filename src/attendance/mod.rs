//! Attendance ingestion: row extraction, reconciliation against the day
//! log, and projection onto the employee registry.

pub mod types;
pub mod extractor;
pub mod merge;
pub mod reconcile;
pub mod registry;
pub mod ingest;

pub use types::*;
pub use extractor::extract_candidates;
pub use merge::{Field, FieldRule, MergePolicy, MergeTarget};
pub use reconcile::{reconcile, EmployeeIndex};
pub use registry::update_registry;
pub use ingest::{ingest_rows, ingest_workbook, IngestError};
