//! SQLite Storage
//! Mission: Own the schema and run every query off the async runtime

use rusqlite::{Connection, ErrorCode};
use std::path::{Path, PathBuf};
use tracing::info;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT UNIQUE NOT NULL,
    fullname TEXT NOT NULL DEFAULT '',
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS folders (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    user_id TEXT NOT NULL REFERENCES users(id),
    UNIQUE (user_id, name)
);

CREATE TABLE IF NOT EXISTS tags (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    user_id TEXT NOT NULL REFERENCES users(id),
    UNIQUE (user_id, name)
);

CREATE TABLE IF NOT EXISTS notes (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    folder_id TEXT REFERENCES folders(id),
    user_id TEXT NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notes_user_updated ON notes (user_id, updated_at DESC);

CREATE TABLE IF NOT EXISTS note_tags (
    note_id TEXT NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
    tag_id TEXT NOT NULL REFERENCES tags(id),
    PRIMARY KEY (note_id, tag_id)
);
";

/// Storage failures surfaced to the service layer
#[derive(Debug)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    Conflict(String),
    Sqlite(rusqlite::Error),
    /// The blocking worker panicked or was cancelled
    Task(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Conflict(message) => write!(f, "conflict: {message}"),
            StoreError::Sqlite(err) => write!(f, "sqlite error: {err}"),
            StoreError::Task(detail) => write!(f, "storage task failed: {detail}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Sqlite(err)
    }
}

/// Turn a UNIQUE violation into a `Conflict` carrying `message`.
pub fn conflict_on_unique(err: rusqlite::Error, message: &str) -> StoreError {
    if let rusqlite::Error::SqliteFailure(e, _) = &err {
        if e.code == ErrorCode::ConstraintViolation {
            return StoreError::Conflict(message.to_string());
        }
    }
    StoreError::Sqlite(err)
}

/// File-backed SQLite database. Every operation opens its own connection on
/// the blocking pool, so concurrent requests never share a handle.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    /// Open (or create) the database at `path` and apply the schema
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Self {
            path: path.as_ref().to_path_buf(),
        };
        let conn = db.connect()?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %db.path.display(), "Database schema ready");
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
        Ok(conn)
    }

    /// Run `f` against a fresh connection on tokio's blocking pool
    pub async fn call<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = db.connect()?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

/// Timestamp format used for every `*_at` column. Fixed width, so string
/// order matches time order.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let temp = NamedTempFile::new().unwrap();
        Database::open(temp.path()).unwrap();
        let db = Database::open(temp.path()).unwrap();

        let tables: i64 = db
            .call(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .await
            .unwrap();
        assert_eq!(tables, 5);
    }

    #[tokio::test]
    async fn test_unique_violation_maps_to_conflict() {
        let temp = NamedTempFile::new().unwrap();
        let db = Database::open(temp.path()).unwrap();

        let insert = |conn: &mut Connection| -> Result<(), StoreError> {
            conn.execute(
                "INSERT INTO users (id, username, password_hash, created_at)
                 VALUES (lower(hex(randomblob(16))), 'dup', 'x', 'now')",
                [],
            )
            .map_err(|e| conflict_on_unique(e, "taken"))?;
            Ok(())
        };

        db.call(insert).await.unwrap();
        match db.call(insert).await {
            Err(StoreError::Conflict(message)) => assert_eq!(message, "taken"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_timestamps_sort_lexically() {
        let a = now_timestamp();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = now_timestamp();
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }
}
