use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::IngestionEntry;
use super::{RecordStore, StorePath, ATTENDANCE_ROOT};
use crate::attendance::RecordSet;
use crate::database::{Database, DbError};

impl Database {
    /// Create the record table backing every store path
    pub fn create_record_tables(&self) -> Result<(), DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                path TEXT NOT NULL,
                key TEXT NOT NULL,
                body TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (path, key)
            )",
            [],
        )?;

        Ok(())
    }

    /// Create the ingestion history table
    pub fn create_ingestion_tables(&self) -> Result<(), DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS ingestions (
                id TEXT PRIMARY KEY,
                target_date TEXT NOT NULL,
                checksum TEXT NOT NULL,
                sheet TEXT NOT NULL,
                rows_read INTEGER NOT NULL,
                rows_accepted INTEGER NOT NULL,
                rows_skipped INTEGER NOT NULL,
                inserted INTEGER NOT NULL,
                updated INTEGER NOT NULL,
                batch_duplicates INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_ingestions_created_at
             ON ingestions(created_at DESC)",
            [],
        )?;

        Ok(())
    }

    /// Dates that have a stored attendance log, newest first
    pub fn list_day_log_dates(&self) -> Result<Vec<String>, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;
        let prefix = format!("{}/", ATTENDANCE_ROOT);

        let mut stmt = conn.prepare(
            "SELECT DISTINCT substr(path, ?2) FROM records
             WHERE substr(path, 1, ?1) = ?3
             ORDER BY 1 DESC",
        )?;

        let rows = stmt.query_map(
            rusqlite::params![prefix.len() as i64, prefix.len() as i64 + 1, prefix],
            |row| row.get::<_, String>(0),
        )?;

        let mut dates = Vec::new();
        for row in rows {
            dates.push(row?);
        }

        Ok(dates)
    }

    /// Append an ingestion to the history
    pub fn record_ingestion(&self, entry: &IngestionEntry) -> Result<(), DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        conn.execute(
            "INSERT INTO ingestions (id, target_date, checksum, sheet, rows_read, rows_accepted,
                rows_skipped, inserted, updated, batch_duplicates, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                entry.id,
                entry.target_date,
                entry.checksum,
                entry.sheet,
                entry.rows_read,
                entry.rows_accepted,
                entry.rows_skipped,
                entry.inserted,
                entry.updated,
                entry.batch_duplicates,
                entry.created_at
            ],
        )?;

        Ok(())
    }

    /// List recent ingestions, newest first
    pub fn list_ingestions(&self, limit: Option<u32>) -> Result<Vec<IngestionEntry>, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;
        let limit_val = limit.unwrap_or(50);

        let mut stmt = conn.prepare(
            "SELECT id, target_date, checksum, sheet, rows_read, rows_accepted, rows_skipped,
                    inserted, updated, batch_duplicates, created_at
             FROM ingestions
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map([limit_val], |row| {
            Ok(IngestionEntry {
                id: row.get(0)?,
                target_date: row.get(1)?,
                checksum: row.get(2)?,
                sheet: row.get(3)?,
                rows_read: row.get(4)?,
                rows_accepted: row.get(5)?,
                rows_skipped: row.get(6)?,
                inserted: row.get(7)?,
                updated: row.get(8)?,
                batch_duplicates: row.get(9)?,
                created_at: row.get(10)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }

        Ok(entries)
    }
}

impl RecordStore for Database {
    fn read<T: DeserializeOwned>(&self, path: &StorePath) -> Result<RecordSet<T>, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        let mut stmt = conn.prepare("SELECT key, body FROM records WHERE path = ?1")?;
        let rows = stmt.query_map([path.as_path()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut records = RecordSet::new();
        for row in rows {
            let (key, body) = row?;
            records.insert(key, serde_json::from_str(&body)?);
        }

        Ok(records)
    }

    fn write<T: Serialize>(&self, path: &StorePath, records: &RecordSet<T>) -> Result<(), DbError> {
        // Serialize up front so a bad record cannot leave a half-written path
        let mut bodies = Vec::with_capacity(records.len());
        for (key, record) in records {
            bodies.push((key.as_str(), serde_json::to_string(record)?));
        }

        let mut conn = self.conn.lock().map_err(|_| DbError::Lock)?;
        let now = chrono::Utc::now().timestamp_millis();
        let path = path.as_path();

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM records WHERE path = ?1", [&path])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO records (path, key, body, updated_at) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (key, body) in &bodies {
                stmt.execute(rusqlite::params![path, key, body, now])?;
            }
        }
        tx.commit()?;

        Ok(())
    }
}
