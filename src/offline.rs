//! Local queue of voice-entered transactions captured while offline.
//!
//! Records live in their own SQLite file, keyed by a UUID and flagged
//! `synced` once they have been pushed to the main store. Syncing is a
//! single best-effort pass: failed records simply stay unsynced for the
//! next pass.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{NewOfflineRecord, OfflineRecord};
use crate::validation;

const SELECT_RECORD: &str =
    "SELECT id, kind, transcript, description, amount, quantity, created_at, synced, synced_at
     FROM offline_records";

pub struct OfflineStore {
    conn: Mutex<Connection>,
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<OfflineRecord> {
    Ok(OfflineRecord {
        id: row.get(0)?,
        kind: row.get(1)?,
        transcript: row.get(2)?,
        description: row.get(3)?,
        amount: row.get(4)?,
        quantity: row.get(5)?,
        created_at: row.get(6)?,
        synced: row.get(7)?,
        synced_at: row.get(8)?,
    })
}

impl OfflineStore {
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS offline_records (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                transcript TEXT NOT NULL,
                description TEXT NOT NULL,
                amount REAL NOT NULL,
                quantity REAL NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                synced INTEGER NOT NULL DEFAULT 0,
                synced_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_offline_records_synced ON offline_records(synced);
            ",
        )?;

        Ok(OfflineStore {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        Ok(self.conn.lock()?)
    }

    pub fn save_record(&self, record: NewOfflineRecord) -> AppResult<OfflineRecord> {
        validation::positive("Amount", record.amount)?;
        validation::positive("Quantity", record.quantity)?;

        let saved = OfflineRecord {
            id: Uuid::new_v4().to_string(),
            kind: record.kind,
            transcript: record.transcript,
            description: record.description.trim().to_string(),
            amount: record.amount,
            quantity: record.quantity,
            // Fixed-width so text order is creation order
            created_at: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
            synced: false,
            synced_at: None,
        };

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO offline_records (id, kind, transcript, description, amount, quantity, created_at, synced)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
            params![
                saved.id,
                saved.kind,
                saved.transcript,
                saved.description,
                saved.amount,
                saved.quantity,
                saved.created_at
            ],
        )?;

        tracing::info!(id = %saved.id, kind = saved.kind.as_str(), "offline record saved");
        Ok(saved)
    }

    pub fn get_record(&self, id: &str) -> AppResult<Option<OfflineRecord>> {
        let conn = self.lock()?;

        let record = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_RECORD),
                [id],
                record_from_row,
            )
            .optional()?;

        Ok(record)
    }

    pub fn get_all_records(&self) -> AppResult<Vec<OfflineRecord>> {
        self.query_records(&format!("{} ORDER BY created_at, rowid", SELECT_RECORD))
    }

    pub fn get_unsynced_records(&self) -> AppResult<Vec<OfflineRecord>> {
        self.query_records(&format!(
            "{} WHERE synced = 0 ORDER BY created_at, rowid",
            SELECT_RECORD
        ))
    }

    fn query_records(&self, sql: &str) -> AppResult<Vec<OfflineRecord>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(sql)?;
        let records = stmt
            .query_map([], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    pub fn mark_as_synced(&self, id: &str) -> AppResult<()> {
        let conn = self.lock()?;

        let changed = conn.execute(
            "UPDATE offline_records SET synced = 1, synced_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id],
        )?;
        if changed == 0 {
            return Err(AppError::not_found("Offline record", id));
        }

        tracing::debug!(id, "offline record marked as synced");
        Ok(())
    }

    pub fn delete_record(&self, id: &str) -> AppResult<()> {
        let conn = self.lock()?;

        let deleted = conn.execute("DELETE FROM offline_records WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(AppError::not_found("Offline record", id));
        }

        Ok(())
    }

    /// Drops records that already reached the main store. Returns how many.
    pub fn clear_synced(&self) -> AppResult<usize> {
        let conn = self.lock()?;

        let deleted = conn.execute("DELETE FROM offline_records WHERE synced = 1", [])?;
        tracing::info!(deleted, "synced offline records cleared");
        Ok(deleted)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub pushed: usize,
    pub failed: usize,
}

/// Pushes every unsynced record once, oldest first.
///
/// A record is marked synced only when `push` succeeds. Failures are logged
/// and counted; nothing is retried within the pass.
pub fn sync_pending<F>(store: &OfflineStore, mut push: F) -> AppResult<SyncReport>
where
    F: FnMut(&OfflineRecord) -> AppResult<()>,
{
    let mut report = SyncReport::default();

    for record in store.get_unsynced_records()? {
        match push(&record) {
            Ok(()) => {
                store.mark_as_synced(&record.id)?;
                report.pushed += 1;
            }
            Err(e) => {
                tracing::warn!(id = %record.id, error = %e, "offline record failed to sync");
                report.failed += 1;
            }
        }
    }

    tracing::info!(pushed = report.pushed, failed = report.failed, "offline sync finished");
    Ok(report)
}
