//! Manifest schema definitions
//!
//! The manifest is an output artifact for downstream indexing: it records what each run stored.
//! It is never read back as crawl state.

/// SQL schema for the manifest database
pub const SCHEMA_SQL: &str = r#"
-- One row per crawl run
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    pages_stored INTEGER NOT NULL DEFAULT 0,
    fetches_dispatched INTEGER NOT NULL DEFAULT 0,
    fetch_failures INTEGER NOT NULL DEFAULT 0,
    report_json TEXT
);

-- One row per stored document
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    url TEXT NOT NULL,
    title TEXT NOT NULL,
    store_key TEXT NOT NULL,
    path TEXT NOT NULL,
    size INTEGER NOT NULL,
    fields_json TEXT NOT NULL,
    stored_at TEXT NOT NULL,
    UNIQUE(run_id, url)
);

CREATE INDEX IF NOT EXISTS idx_documents_run ON documents(run_id);
CREATE INDEX IF NOT EXISTS idx_documents_key ON documents(store_key);
"#;

/// Initializes the manifest schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
