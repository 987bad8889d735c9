use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::attendance::IngestSummary;

/// One row of ingestion history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionEntry {
    pub id: String,
    pub target_date: String,
    pub checksum: String,
    pub sheet: String,
    pub rows_read: i64,
    pub rows_accepted: i64,
    pub rows_skipped: i64,
    pub inserted: i64,
    pub updated: i64,
    pub batch_duplicates: i64,
    pub created_at: i64,
}

impl IngestionEntry {
    /// History row for a finished ingestion, stamped with the current time
    pub fn from_summary(target_date: NaiveDate, summary: &IngestSummary) -> Self {
        IngestionEntry {
            id: uuid::Uuid::new_v4().to_string(),
            target_date: target_date.format("%Y-%m-%d").to_string(),
            checksum: summary.checksum.clone(),
            sheet: summary.sheet.clone(),
            rows_read: summary.rows_read as i64,
            rows_accepted: summary.rows_accepted as i64,
            rows_skipped: summary.rows_skipped as i64,
            inserted: summary.inserted_count as i64,
            updated: summary.updated_count as i64,
            batch_duplicates: summary.batch_duplicates as i64,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
