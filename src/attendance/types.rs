use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Records stored under one path, keyed by storage key
pub type RecordSet<T> = BTreeMap<String, T>;

/// One employee's attendance on one calendar date
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttendanceRecord {
    pub employee_code: String,
    pub sequence_number: i64,
    pub secondary_code: String,
    pub full_name: String,
    pub gender_flag: String,
    pub birth_date: String, // YYYY-MM-DD or empty
    pub department_code: String,
    pub department_name: String,
    pub shift: String,
    pub time_in: String, // clock time, leave code, or empty
    pub time_out: String,
    pub time_keeping_code: String,
}

/// Latest known attributes of an employee, independent of date
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmployeeProfile {
    pub employee_code: String,
    pub secondary_code: String,
    pub full_name: String,
    pub gender_flag: String,
    pub birth_date: String,
    pub department_code: String,
    pub department_name: String,
    pub shift: String,
    pub time_in: String,
    pub time_out: String,
    pub time_keeping_code: String,
    pub last_attendance_date: String,
}

impl EmployeeProfile {
    /// A blank profile for an employee seen for the first time
    pub fn for_code(employee_code: &str) -> Self {
        EmployeeProfile {
            employee_code: employee_code.to_string(),
            ..Default::default()
        }
    }
}

/// A record parsed from one workbook row, not yet reconciled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRow {
    /// Synthetic batch key (`emp_<rowIndex>`), meaningless once persisted
    pub row_key: String,
    /// Index into the data rows (headers excluded)
    pub row_index: usize,
    pub record: AttendanceRecord,
}

/// Why a row was left out of the candidate set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    Blank,
    InvalidEmployeeCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
    /// 1-based row number as shown in the spreadsheet
    pub sheet_row: usize,
    pub reason: SkipReason,
}

/// A non-fatal observation about an accepted row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowWarning {
    pub sheet_row: usize,
    pub employee_code: String,
    pub message: String,
}

/// Outcome of extracting candidates from one sheet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub candidates: Vec<CandidateRow>,
    pub skipped: Vec<SkippedRow>,
    pub warnings: Vec<RowWarning>,
    pub rows_read: usize,
}

/// Result of merging a batch into one date's attendance log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub records: RecordSet<AttendanceRecord>,
    pub inserted_count: usize,
    pub updated_count: usize,
    /// Rows that lost to a later row with the same employee code
    pub batch_duplicates: usize,
}

/// Result of projecting a batch onto the employee registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryUpdate {
    pub profiles: RecordSet<EmployeeProfile>,
    pub created: usize,
    pub refreshed: usize,
}

/// Counters reported back to the caller after an ingestion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub inserted_count: usize,
    pub updated_count: usize,
    pub batch_duplicates: usize,
    pub rows_read: usize,
    pub rows_accepted: usize,
    pub rows_skipped: usize,
    pub registry_created: usize,
    pub registry_refreshed: usize,
    pub sheet: String,
    pub checksum: String,
}

impl IngestSummary {
    /// The upload succeeded but nothing in it was usable
    pub fn is_near_miss(&self) -> bool {
        self.rows_accepted == 0
    }
}

/// Everything an ingestion produced, including the sets actually written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub summary: IngestSummary,
    pub day_log: RecordSet<AttendanceRecord>,
    pub registry: RecordSet<EmployeeProfile>,
    pub skipped: Vec<SkippedRow>,
    pub warnings: Vec<RowWarning>,
}
