pub mod attendance;
pub mod commands;
pub mod config;
pub mod database;
pub mod excel;
pub mod store;

pub use attendance::{
    ingest_rows, ingest_workbook, AttendanceRecord, EmployeeProfile, IngestError, IngestOutcome,
    IngestSummary,
};
pub use commands::{AppState, CommandError};
pub use config::{AppConfig, ConfigError, LogConfig};
pub use database::{Database, DbError};
pub use store::{MemoryStore, RecordStore, StorePath};

use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Database(#[from] DbError),
}

/// Install the global fmt subscriber. Returns false when one is already set.
pub fn init_logging(config: &LogConfig) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(config.max_level())
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .is_ok()
}

/// Load the user config, start logging and open the database
pub fn run() -> Result<Arc<AppState>, StartupError> {
    let config = AppConfig::load()?;
    start(config)
}

pub fn start(config: AppConfig) -> Result<Arc<AppState>, StartupError> {
    init_logging(&config.log);
    tracing::info!(
        sheet = config.ingest.sheet.as_deref().unwrap_or("<first>"),
        header_rows = config.ingest.header_rows,
        "Starting attendance ingestion service"
    );

    Ok(AppState::open(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_opens_configured_database() {
        let dir = std::env::temp_dir().join(format!("attendance-start-{}", uuid::Uuid::new_v4()));
        let config = AppConfig {
            database_path: dir.join("attendance.db"),
            ..Default::default()
        };

        let state = start(config).unwrap();
        assert!(state.db.list_day_log_dates().unwrap().is_empty());
        assert!(dir.join("attendance.db").exists());

        drop(state);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_init_logging_twice_is_harmless() {
        let config = LogConfig::default();
        init_logging(&config);
        assert!(!init_logging(&config));
    }
}
