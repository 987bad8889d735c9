use crate::attendance::{
    ingest_workbook, AttendanceRecord, EmployeeProfile, IngestError, IngestOutcome, RecordSet,
};
use crate::config::AppConfig;
use crate::database::{Database, DbError};
use crate::excel::{self, ExcelError, SheetInfo};
use crate::store::{IngestionEntry, RecordStore, StorePath};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

pub struct AppState {
    pub db: Arc<Database>,
    pub config: AppConfig,
}

impl AppState {
    /// Open the configured database and wrap it for sharing between commands
    pub fn open(config: AppConfig) -> Result<Arc<Self>, DbError> {
        let db = Database::open(&config.database_path)?;
        tracing::info!(path = %config.database_path.display(), "Database opened");
        Ok(Arc::new(AppState {
            db: Arc::new(db),
            config,
        }))
    }
}

#[derive(Debug, Serialize)]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<DbError> for CommandError {
    fn from(e: DbError) -> Self {
        CommandError {
            message: e.to_string(),
        }
    }
}

impl From<ExcelError> for CommandError {
    fn from(e: ExcelError) -> Self {
        CommandError {
            message: e.to_string(),
        }
    }
}

impl From<IngestError> for CommandError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::Workbook(e) => e.into(),
            // Storage details stay in the log
            IngestError::Store(e) => {
                tracing::error!(error = %e, "Attendance ingestion failed to persist");
                CommandError {
                    message: "Failed to save attendance data".to_string(),
                }
            }
        }
    }
}

fn join_error(e: tokio::task::JoinError) -> CommandError {
    CommandError {
        message: format!("Task join error: {}", e),
    }
}

fn parse_target_date(date: &str) -> Result<NaiveDate, CommandError> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| CommandError {
        message: format!("Invalid date '{}', expected YYYY-MM-DD", date),
    })
}

// Attendance commands

/// Ingest an uploaded attendance workbook for one date
pub async fn ingest_attendance(
    state: &Arc<AppState>,
    bytes: Vec<u8>,
    date: String,
) -> Result<IngestOutcome, CommandError> {
    let target_date = parse_target_date(&date)?;
    let db = state.db.clone();
    let options = state.config.read_options();

    let outcome = tokio::task::spawn_blocking(move || {
        let outcome = ingest_workbook(&*db, &bytes, target_date, &options)?;

        let entry = IngestionEntry::from_summary(target_date, &outcome.summary);
        if let Err(e) = db.record_ingestion(&entry) {
            tracing::warn!(date = %target_date, error = %e, "Failed to record ingestion history");
        }

        Ok::<_, IngestError>(outcome)
    })
    .await
    .map_err(join_error)??;

    Ok(outcome)
}

/// Stored attendance log for one date
pub async fn get_day_log(
    state: &Arc<AppState>,
    date: String,
) -> Result<RecordSet<AttendanceRecord>, CommandError> {
    let path = StorePath::DayLog(parse_target_date(&date)?);
    let db = state.db.clone();

    let records: RecordSet<AttendanceRecord> = tokio::task::spawn_blocking(move || db.read(&path))
        .await
        .map_err(join_error)??;

    Ok(records)
}

/// Current employee registry
pub async fn get_registry(
    state: &Arc<AppState>,
) -> Result<RecordSet<EmployeeProfile>, CommandError> {
    let path = StorePath::Registry;
    let db = state.db.clone();

    let profiles: RecordSet<EmployeeProfile> = tokio::task::spawn_blocking(move || db.read(&path))
        .await
        .map_err(join_error)??;

    Ok(profiles)
}

pub async fn list_attendance_dates(state: &Arc<AppState>) -> Result<Vec<String>, CommandError> {
    let db = state.db.clone();

    let dates = tokio::task::spawn_blocking(move || db.list_day_log_dates())
        .await
        .map_err(join_error)??;

    Ok(dates)
}

pub async fn list_ingestions(
    state: &Arc<AppState>,
    limit: Option<u32>,
) -> Result<Vec<IngestionEntry>, CommandError> {
    let db = state.db.clone();

    let entries = tokio::task::spawn_blocking(move || db.list_ingestions(limit))
        .await
        .map_err(join_error)??;

    Ok(entries)
}

/// Sheets in an uploaded workbook, for choosing which one to ingest
pub async fn get_workbook_sheets(bytes: Vec<u8>) -> Result<Vec<SheetInfo>, CommandError> {
    let sheets = tokio::task::spawn_blocking(move || excel::get_sheets(&bytes))
        .await
        .map_err(join_error)??;

    Ok(sheets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::reader::tests::build_workbook;
    use crate::excel::CellValue;

    fn state() -> Arc<AppState> {
        Arc::new(AppState {
            db: Arc::new(Database::open_in_memory().unwrap()),
            config: AppConfig::default(),
        })
    }

    fn workbook(time_in: &str) -> Vec<u8> {
        let row = vec![
            CellValue::Number(1.0),
            CellValue::from("1001"),
            CellValue::Empty,
            CellValue::from("Nguyen Van A"),
            CellValue::from("0"),
            CellValue::from("1990-09-14"),
            CellValue::from("D01"),
            CellValue::from("Molding"),
            CellValue::from(time_in),
            CellValue::from("16:30"),
            CellValue::from("A"),
        ];
        build_workbook(&[
            vec![CellValue::from("Attendance")],
            vec![CellValue::from("STT"), CellValue::from("MSNV")],
            row,
        ])
    }

    #[tokio::test]
    async fn test_ingest_attendance_persists_and_records_history() {
        let state = state();

        let outcome = ingest_attendance(&state, workbook("07:30"), "2025-09-14".to_string())
            .await
            .unwrap();
        assert_eq!(outcome.summary.inserted_count, 1);

        let day = get_day_log(&state, "2025-09-14".to_string()).await.unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day.values().next().unwrap().time_in, "07:30");

        let registry = get_registry(&state).await.unwrap();
        assert_eq!(registry["1001"].last_attendance_date, "2025-09-14");

        let history = list_ingestions(&state, None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].target_date, "2025-09-14");
        assert_eq!(history[0].inserted, 1);

        assert_eq!(list_attendance_dates(&state).await.unwrap(), vec!["2025-09-14"]);
    }

    #[tokio::test]
    async fn test_reupload_updates_in_place() {
        let state = state();
        ingest_attendance(&state, workbook("07:30"), "2025-09-14".to_string())
            .await
            .unwrap();

        let outcome = ingest_attendance(&state, workbook("PN"), "2025-09-14".to_string())
            .await
            .unwrap();

        assert_eq!(outcome.summary.inserted_count, 0);
        assert_eq!(outcome.summary.updated_count, 1);
        let day = get_day_log(&state, "2025-09-14".to_string()).await.unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day.values().next().unwrap().time_in, "PN");
        assert_eq!(list_ingestions(&state, Some(10)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_date_is_rejected() {
        let state = state();
        let err = ingest_attendance(&state, workbook("07:30"), "14/09/2025".to_string())
            .await
            .unwrap_err();

        assert!(err.message().contains("Invalid date"));
        assert!(list_ingestions(&state, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_workbook_reports_message() {
        let state = state();
        let err = ingest_attendance(&state, b"garbage".to_vec(), "2025-09-14".to_string())
            .await
            .unwrap_err();

        assert!(!err.message().is_empty());
        assert!(list_attendance_dates(&state).await.unwrap().is_empty());
        assert!(list_ingestions(&state, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_workbook_sheets() {
        let sheets = get_workbook_sheets(workbook("07:30")).await.unwrap();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].name, "Sheet1");
    }

    #[test]
    fn test_storage_errors_get_generic_message() {
        let err: CommandError = IngestError::Store(DbError::Lock).into();
        assert_eq!(err.message(), "Failed to save attendance data");
    }
}
