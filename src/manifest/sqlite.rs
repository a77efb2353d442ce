//! SQLite manifest implementation

use crate::crawler::{DocumentRecord, RunReport};
use crate::manifest::schema::initialize_schema;
use crate::manifest::{
    DocumentRow, ManifestError, ManifestResult, ManifestStats, RunRecord, RunStatus,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite manifest backend
pub struct SqliteManifest {
    conn: Connection,
}

impl SqliteManifest {
    /// Opens or creates a manifest database
    pub fn new(path: &Path) -> ManifestResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory manifest
    pub fn new_in_memory() -> ManifestResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Records the start of a run and returns its ID
    pub fn begin_run(&mut self, config_hash: &str) -> ManifestResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Records a stored document
    pub fn record_document(
        &mut self,
        run_id: i64,
        record: &DocumentRecord,
        store_key: &str,
        path: &Path,
    ) -> ManifestResult<()> {
        let fields_json = serde_json::to_string(&record.fields)?;
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT INTO documents (run_id, url, title, store_key, path, size, fields_json, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                run_id,
                record.source_url,
                record.title,
                store_key,
                path.to_string_lossy().into_owned(),
                record.raw_bytes.len() as i64,
                fields_json,
                now
            ],
        )?;
        Ok(())
    }

    /// Records the end of a run with its final report
    pub fn finish_run(&mut self, run_id: i64, report: &RunReport) -> ManifestResult<()> {
        let now = Utc::now().to_rfc3339();
        let status = if report.cancelled {
            RunStatus::Cancelled
        } else {
            RunStatus::Completed
        };
        let report_json = serde_json::to_string(report)?;

        let updated = self.conn.execute(
            "UPDATE runs
             SET finished_at = ?1, status = ?2, pages_stored = ?3,
                 fetches_dispatched = ?4, fetch_failures = ?5, report_json = ?6
             WHERE id = ?7",
            params![
                now,
                status.to_db_string(),
                report.pages_stored,
                report.fetches_dispatched,
                report.fetch_failures,
                report_json,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(ManifestError::RunNotFound(run_id));
        }
        Ok(())
    }

    /// Gets a run by ID
    pub fn get_run(&self, run_id: i64) -> ManifestResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status,
                        pages_stored, fetches_dispatched, fetch_failures
                 FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(ManifestError::RunNotFound(run_id))
    }

    /// Gets the most recent run
    pub fn latest_run(&self) -> ManifestResult<Option<RunRecord>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status,
                        pages_stored, fetches_dispatched, fetch_failures
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?)
    }

    /// Lists the documents stored by a run, in insertion order
    pub fn documents_for_run(&self, run_id: i64) -> ManifestResult<Vec<DocumentRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, title, store_key, path, size, fields_json
             FROM documents WHERE run_id = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(DocumentRow {
                    url: row.get(0)?,
                    title: row.get(1)?,
                    store_key: row.get(2)?,
                    path: row.get(3)?,
                    size: row.get::<_, i64>(4)? as u64,
                    fields_json: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Counts the documents stored by a run
    pub fn count_documents(&self, run_id: i64) -> ManifestResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Aggregate statistics across every recorded run
    pub fn stats(&self) -> ManifestResult<ManifestStats> {
        let total_runs: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        let (total_documents, total_bytes): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(size), 0) FROM documents",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(ManifestStats {
            total_runs: total_runs as u64,
            total_documents: total_documents as u64,
            total_bytes: total_bytes as u64,
            latest_run: self.latest_run()?,
        })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let status: String = row.get(4)?;
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&status).unwrap_or(RunStatus::Running),
        pages_stored: row.get(5)?,
        fetches_dispatched: row.get(6)?,
        fetch_failures: row.get(7)?,
    })
}
