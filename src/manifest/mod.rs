//! Document manifest
//!
//! SQLite record of every run and of every document it stored, for the downstream indexing
//! collaborator. Write failures during a run are logged and counted, never fatal.

mod schema;
mod sqlite;

pub use sqlite::SqliteManifest;

use thiserror::Error;

/// Errors that can occur during manifest operations
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Run not found: {0}")]
    RunNotFound(i64),
}

/// Result type for manifest operations
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Cancelled,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// A run as recorded in the manifest
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub pages_stored: u32,
    pub fetches_dispatched: u32,
    pub fetch_failures: u32,
}

/// A stored document as recorded in the manifest
#[derive(Debug, Clone)]
pub struct DocumentRow {
    pub url: String,
    pub title: String,
    pub store_key: String,
    pub path: String,
    pub size: u64,
    pub fields_json: String,
}

/// Aggregate manifest statistics
#[derive(Debug, Clone, Default)]
pub struct ManifestStats {
    pub total_runs: u64,
    pub total_documents: u64,
    pub total_bytes: u64,
    pub latest_run: Option<RunRecord>,
}
