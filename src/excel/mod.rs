//! Excel module for reading uploaded attendance workbooks.
//!
//! This module provides:
//! - Reading workbook bytes (xlsx, xls, ods) into positional rows
//! - Detection of the workbook's serial-date epoch
//! - Normalization of date and clock cells into canonical strings

pub mod types;
pub mod reader;
pub mod normalizer;

// Re-export commonly used types and functions
pub use types::*;
pub use reader::{read_workbook, get_sheets, compute_checksum, detect_epoch};
pub use normalizer::{normalize_date, normalize_clock, classify_time_in, TimeInKind, LEAVE_CODES};
