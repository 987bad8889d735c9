//! Persistence gateway for the day logs and the employee registry.
//!
//! Records live under logical paths (`attendance/<date>`, `employees`).
//! A path is always read and written as a whole.

pub mod types;
pub mod storage;
pub mod memory;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

use crate::attendance::RecordSet;
use crate::database::DbError;

pub use types::*;
pub use memory::MemoryStore;

pub const ATTENDANCE_ROOT: &str = "attendance";
pub const REGISTRY_ROOT: &str = "employees";

/// Logical location of a record set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorePath {
    DayLog(NaiveDate),
    Registry,
}

impl StorePath {
    pub fn as_path(&self) -> String {
        match self {
            StorePath::DayLog(date) => format!("{}/{}", ATTENDANCE_ROOT, date.format("%Y-%m-%d")),
            StorePath::Registry => REGISTRY_ROOT.to_string(),
        }
    }

    /// Parse `attendance/<YYYY-MM-DD>` or `employees`
    pub fn parse(path: &str) -> Option<Self> {
        if path == REGISTRY_ROOT {
            return Some(StorePath::Registry);
        }
        let date = path.strip_prefix(ATTENDANCE_ROOT)?.strip_prefix('/')?;
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok().map(StorePath::DayLog)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_path())
    }
}

/// Key-addressable record store with atomic per-path read/write
pub trait RecordStore: Send + Sync {
    /// Read every record under `path`; a missing path is an empty set
    fn read<T: DeserializeOwned>(&self, path: &StorePath) -> Result<RecordSet<T>, DbError>;

    /// Replace everything under `path` with `records`, all or nothing
    fn write<T: Serialize>(&self, path: &StorePath, records: &RecordSet<T>) -> Result<(), DbError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_path_round_trip() {
        let day = StorePath::DayLog(NaiveDate::from_ymd_opt(2025, 9, 4).unwrap());
        assert_eq!(day.as_path(), "attendance/2025-09-04");
        assert_eq!(StorePath::parse("attendance/2025-09-04"), Some(day));
        assert_eq!(StorePath::Registry.to_string(), "employees");
        assert_eq!(StorePath::parse("employees"), Some(StorePath::Registry));
        assert_eq!(StorePath::parse("attendance/yesterday"), None);
        assert_eq!(StorePath::parse("attendance2025-09-04"), None);
    }
}
