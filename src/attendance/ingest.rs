//! One ingestion: workbook bytes in, reconciled day log and registry out.
//!
//! Both stores are read and both merged sets computed before anything is
//! written. The day log is written before the registry.

use chrono::NaiveDate;

use crate::database::DbError;
use crate::excel::{read_workbook, ExcelError, SheetRows, WorkbookReadOptions};
use crate::store::{RecordStore, StorePath};

use super::extractor::extract_candidates;
use super::merge::MergePolicy;
use super::reconcile::reconcile;
use super::registry::update_registry;
use super::types::*;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Workbook could not be read: {0}")]
    Workbook(#[from] ExcelError),
    #[error("Storage failure: {0}")]
    Store(#[from] DbError),
}

/// Parse an uploaded workbook and reconcile it into the stores
pub fn ingest_workbook<S: RecordStore>(
    store: &S,
    bytes: &[u8],
    target_date: NaiveDate,
    options: &WorkbookReadOptions,
) -> Result<IngestOutcome, IngestError> {
    let sheet = read_workbook(bytes, options)?;
    ingest_rows(store, &sheet, target_date)
}

/// Reconcile already-loaded sheet rows into the stores
pub fn ingest_rows<S: RecordStore>(
    store: &S,
    sheet: &SheetRows,
    target_date: NaiveDate,
) -> Result<IngestOutcome, IngestError> {
    let report = extract_candidates(&sheet.rows, sheet.epoch, sheet.header_rows);

    let day_path = StorePath::DayLog(target_date);
    let stored_day: RecordSet<AttendanceRecord> = store.read(&day_path)?;
    let stored_registry: RecordSet<EmployeeProfile> = store.read(&StorePath::Registry)?;

    let day = reconcile(stored_day, &report.candidates, &MergePolicy::day_log());
    let registry = update_registry(
        stored_registry,
        &report.candidates,
        target_date,
        &MergePolicy::registry(),
    );

    if report.candidates.is_empty() {
        tracing::warn!(
            date = %target_date,
            rows_read = report.rows_read,
            "Workbook produced no usable rows; nothing written"
        );
    } else {
        store.write(&day_path, &day.records)?;
        store
            .write(&StorePath::Registry, &registry.profiles)
            .map_err(|e| {
                tracing::warn!(date = %target_date, error = %e, "Day log written but registry update failed");
                e
            })?;
    }

    let summary = IngestSummary {
        inserted_count: day.inserted_count,
        updated_count: day.updated_count,
        batch_duplicates: day.batch_duplicates,
        rows_read: report.rows_read,
        rows_accepted: report.candidates.len(),
        rows_skipped: report.skipped.len(),
        registry_created: registry.created,
        registry_refreshed: registry.refreshed,
        sheet: sheet.sheet.clone(),
        checksum: sheet.checksum.clone(),
    };

    tracing::info!(
        date = %target_date,
        inserted = summary.inserted_count,
        updated = summary.updated_count,
        skipped = summary.rows_skipped,
        warnings = report.warnings.len(),
        "Attendance ingested"
    );

    Ok(IngestOutcome {
        summary,
        day_log: day.records,
        registry: registry.profiles,
        skipped: report.skipped,
        warnings: report.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::reader::tests::build_workbook;
    use crate::excel::{CellValue, DateEpoch, ExcelErrorType};
    use crate::store::MemoryStore;
    use serde::de::DeserializeOwned;
    use serde::Serialize;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 14).unwrap()
    }

    fn data_row(seq: f64, code: &str, name: &str, time_in: &str) -> Vec<CellValue> {
        let text = |s: &str| if s.is_empty() { CellValue::Empty } else { CellValue::from(s) };
        vec![
            CellValue::Number(seq),
            text(code),
            CellValue::Empty,
            text(name),
            text("0"),
            text("14/09/1990"),
            text("D01"),
            text("Molding"),
            text(time_in),
            text("16:30"),
            text("A"),
            CellValue::Empty,
        ]
    }

    fn sheet(rows: Vec<Vec<CellValue>>) -> SheetRows {
        SheetRows {
            sheet: "Sheet1".to_string(),
            epoch: DateEpoch::Epoch1900,
            checksum: "test".to_string(),
            header_rows: 2,
            rows,
        }
    }

    /// Store whose registry writes always fail
    struct RegistryDown(MemoryStore);

    impl RecordStore for RegistryDown {
        fn read<T: DeserializeOwned>(&self, path: &StorePath) -> Result<RecordSet<T>, DbError> {
            self.0.read(path)
        }

        fn write<T: Serialize>(&self, path: &StorePath, records: &RecordSet<T>) -> Result<(), DbError> {
            if *path == StorePath::Registry {
                return Err(DbError::Lock);
            }
            self.0.write(path, records)
        }
    }

    #[test]
    fn test_scenario_duplicate_and_blank_rows() {
        let store = MemoryStore::new();
        let rows = vec![
            data_row(1.0, "1001", "Row A", "07:20"),
            vec![CellValue::Empty; 12],
            data_row(3.0, "1001", "Row C", "07:45"),
        ];

        let outcome = ingest_rows(&store, &sheet(rows), date()).unwrap();

        assert_eq!(outcome.summary.inserted_count, 1);
        assert_eq!(outcome.summary.updated_count, 0);
        assert_eq!(outcome.summary.batch_duplicates, 1);
        assert_eq!(outcome.summary.rows_skipped, 1);

        let stored: RecordSet<AttendanceRecord> = store.read(&StorePath::DayLog(date())).unwrap();
        assert_eq!(stored.len(), 1);
        let record = stored.values().next().unwrap();
        assert_eq!(record.employee_code, "1001");
        assert_eq!(record.time_in, "07:45");
        assert_eq!(record.full_name, "Row C");
    }

    #[test]
    fn test_idempotent_reingestion() {
        let store = MemoryStore::new();
        let rows = vec![
            data_row(1.0, "1001", "A", "07:20"),
            data_row(2.0, "1002", "B", "PN"),
            data_row(3.0, "1003", "C", ""),
        ];

        let first = ingest_rows(&store, &sheet(rows.clone()), date()).unwrap();
        assert_eq!(first.summary.inserted_count, 3);
        assert_eq!(first.summary.updated_count, 0);
        assert_eq!(first.summary.registry_created, 3);

        let second = ingest_rows(&store, &sheet(rows), date()).unwrap();
        assert_eq!(second.summary.inserted_count, 0);
        assert_eq!(second.summary.updated_count, 3);
        assert_eq!(second.summary.registry_refreshed, 3);

        assert_eq!(first.day_log, second.day_log);
        assert_eq!(first.registry, second.registry);
    }

    #[test]
    fn test_blank_time_in_reupload_keeps_clock_in() {
        let store = MemoryStore::new();
        ingest_rows(&store, &sheet(vec![data_row(1.0, "1001", "A", "07:30")]), date()).unwrap();

        let outcome = ingest_rows(&store, &sheet(vec![data_row(1.0, "1001", "A renamed", "")]), date()).unwrap();

        let record = outcome.day_log.values().next().unwrap();
        assert_eq!(record.time_in, "07:30");
        assert_eq!(record.full_name, "A renamed");
        assert_eq!(outcome.registry["1001"].time_in, "07:30");
    }

    #[test]
    fn test_registry_spans_dates() {
        let store = MemoryStore::new();
        ingest_rows(&store, &sheet(vec![data_row(1.0, "1001", "A", "07:30")]), date()).unwrap();

        let next_day = date().succ_opt().unwrap();
        let outcome = ingest_rows(&store, &sheet(vec![data_row(1.0, "1001", "A", "PN")]), next_day).unwrap();

        assert_eq!(outcome.summary.inserted_count, 1);
        assert_eq!(outcome.summary.registry_refreshed, 1);
        assert_eq!(outcome.registry["1001"].time_in, "PN");
        assert_eq!(outcome.registry["1001"].last_attendance_date, "2025-09-15");

        let first_day: RecordSet<AttendanceRecord> = store.read(&StorePath::DayLog(date())).unwrap();
        assert_eq!(first_day.values().next().unwrap().time_in, "07:30");
    }

    #[test]
    fn test_day_log_written_before_registry_failure() {
        let store = RegistryDown(MemoryStore::new());
        let err = ingest_rows(&store, &sheet(vec![data_row(1.0, "1001", "A", "07:30")]), date()).unwrap_err();
        assert!(matches!(err, IngestError::Store(_)));

        let day: RecordSet<AttendanceRecord> = store.read(&StorePath::DayLog(date())).unwrap();
        assert_eq!(day.len(), 1);
        let registry: RecordSet<EmployeeProfile> = store.read(&StorePath::Registry).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_all_rows_skipped_is_near_miss() {
        let store = MemoryStore::new();
        let rows = vec![data_row(1.0, "abc", "A", "07:30"), data_row(2.0, "0", "B", "")];

        let outcome = ingest_rows(&store, &sheet(rows), date()).unwrap();

        assert!(outcome.summary.is_near_miss());
        assert_eq!(outcome.summary.inserted_count, 0);
        assert_eq!(outcome.summary.rows_skipped, 2);
        assert_eq!(store.path_count(), 0);
    }

    #[test]
    fn test_unreadable_workbook_writes_nothing() {
        let store = MemoryStore::new();
        let err = ingest_workbook(&store, b"not a workbook", date(), &WorkbookReadOptions::default()).unwrap_err();

        match err {
            IngestError::Workbook(e) => assert_eq!(e.error_type, ExcelErrorType::InvalidFormat),
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(store.path_count(), 0);
    }

    #[test]
    fn test_ingest_workbook_end_to_end() {
        let store = MemoryStore::new();
        let mut rows = vec![
            vec![CellValue::from("STT"), CellValue::from("MSNV"), CellValue::from("Ho ten")],
            vec![CellValue::from("No."), CellValue::from("Code"), CellValue::from("Name")],
        ];
        let mut first = data_row(1.0, "", "Nguyen Van A", "");
        first[1] = CellValue::Number(1001.0);
        first[5] = CellValue::Number(33130.0);
        first[8] = CellValue::Number(0.3125);
        rows.push(first);
        rows.push(data_row(2.0, "1002", "Tran Thi B", "KP"));

        let bytes = build_workbook(&rows);
        let outcome = ingest_workbook(&store, &bytes, date(), &WorkbookReadOptions::default()).unwrap();

        assert_eq!(outcome.summary.inserted_count, 2);
        assert_eq!(outcome.summary.sheet, "Sheet1");
        assert_eq!(outcome.summary.checksum, crate::excel::compute_checksum(&bytes));

        let by_code: std::collections::HashMap<_, _> = outcome
            .day_log
            .values()
            .map(|r| (r.employee_code.as_str(), r))
            .collect();
        assert_eq!(by_code["1001"].birth_date, "1990-09-14");
        assert_eq!(by_code["1001"].time_in, "07:30");
        assert_eq!(by_code["1002"].time_in, "KP");
        assert_eq!(by_code["1002"].birth_date, "1990-09-14");
    }
}
