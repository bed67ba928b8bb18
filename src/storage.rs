//! Local persistence for journeys, users, and image assets.
//!
//! Everything lives under one data directory:
//!
//! ```text
//! <root>/
//!   compass.sqlite       # journey, user, session, asset tables
//!   assets/<digest>.zst  # zstd-compressed image blobs, content addressed
//!   draft.json           # the CLI's working draft, if any
//! ```

mod asset;
mod draft;
mod journey;
mod user;

use std::{fs, io, path::PathBuf, time::Duration};

use rusqlite::Connection;
use uuid::Uuid;

pub use asset::asset_url;
pub use user::Credentials;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("journey not found: {0}")]
    JourneyNotFound(Uuid),

    #[error("user already exists: {0}")]
    UserExists(String),

    #[error("asset not found: {0}")]
    AssetNotFound(String),

    #[error("corrupt data: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, StorageError>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS journey (
    seq        INTEGER PRIMARY KEY AUTOINCREMENT,
    id         TEXT NOT NULL UNIQUE,
    document   TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user (
    id            TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,
    salt          TEXT NOT NULL,
    role          TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS session (
    token      TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES user (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS asset (
    digest       TEXT PRIMARY KEY,
    content_type TEXT NOT NULL,
    size         INTEGER NOT NULL,
    created_at   TEXT NOT NULL
);
";

/// Local `SQLite`-backed storage.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Creates a new storage instance rooted at the given directory.
    ///
    /// The directory and schema are created if they don't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("assets"))?;
        let storage = Self { root };
        storage.open_db()?.execute_batch(SCHEMA)?;
        Ok(storage)
    }

    /// Returns the default storage root: `~/.compass/data/`.
    pub fn default_root() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".compass").join("data"))
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Opens a fresh connection; the server shares one `Storage` across threads.
    fn open_db(&self) -> Result<Connection> {
        let conn = Connection::open(self.root.join("compass.sqlite"))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }
}

/// Parses a timestamp column.
fn parse_timestamp(column: &str, value: &str) -> Result<jiff::Timestamp> {
    value
        .parse()
        .map_err(|e| StorageError::Corrupt(format!("invalid {column}: {e}")))
}

fn parse_id(column: &str, value: &str) -> Result<Uuid> {
    value
        .parse()
        .map_err(|e| StorageError::Corrupt(format!("invalid {column}: {e}")))
}
