//! SQLite-based snapshot storage
//!
//! A snapshot is a named collection of request-key → response entries, one per
//! deployed version. The controller writes only to the snapshot tagged with the
//! current version; everything else is stale and removed on activation.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::key::request_key;
use super::request::{Request, Response};
use super::strategy::ResponseCache;
use crate::error::CacheError;

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS snapshots (
    name TEXT PRIMARY KEY NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS snapshot_entries (
    snapshot TEXT NOT NULL,
    request_key TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    stored_at INTEGER NOT NULL,
    PRIMARY KEY (snapshot, request_key)
);
"#;

type Result<T> = std::result::Result<T, CacheError>;

/// SQLite-backed snapshot storage shared by every request the controller handles
pub struct SnapshotStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SnapshotStore {
    /// Open or create snapshot storage inside `data_dir`
    pub fn open_at(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .map_err(|e| CacheError::Io(format!("Failed to create data dir: {}", e)))?;

        let db_path = data_dir.join("snapshots.db");
        let conn = Connection::open(&db_path)?;

        // Snapshots are disposable: a schema mismatch rebuilds from scratch
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Snapshot schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            std::fs::remove_file(&db_path)
                .map_err(|e| CacheError::Io(format!("Failed to remove snapshot DB: {}", e)))?;
            return Self::open_at(data_dir);
        }

        conn.execute_batch(SCHEMA)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CacheError::Io(format!("Lock poisoned: {}", e)))
    }

    /// Create the named snapshot if it does not exist
    pub fn open_snapshot(&self, name: &str) -> Result<()> {
        let conn = self.lock()?;
        Self::ensure_snapshot(&conn, name)
    }

    fn ensure_snapshot(conn: &Connection, name: &str) -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO snapshots (name, created_at) VALUES (?1, ?2)",
            params![name, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    pub fn has(&self, name: &str) -> Result<bool> {
        let conn = self.lock()?;
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM snapshots WHERE name = ?1", [name], |r| {
                r.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    /// Names of all snapshots, oldest first
    pub fn keys(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT name FROM snapshots ORDER BY created_at, name")?;
        let names = stmt
            .query_map([], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Delete a snapshot and all its entries. Returns whether it existed.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM snapshot_entries WHERE snapshot = ?1", [name])?;
        let deleted = tx.execute("DELETE FROM snapshots WHERE name = ?1", [name])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    /// Stored response for `key` in snapshot `name`
    pub fn lookup(&self, name: &str, key: &str) -> Result<Option<Response>> {
        let conn = self.lock()?;
        let row: Option<(u16, String, Vec<u8>)> = conn
            .query_row(
                "SELECT status, headers, body FROM snapshot_entries
                 WHERE snapshot = ?1 AND request_key = ?2",
                params![name, key],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?;

        match row {
            Some((status, headers, body)) => {
                let headers = serde_json::from_str(&headers)
                    .map_err(|e| CacheError::Io(format!("Corrupt headers for {}: {}", key, e)))?;
                Ok(Some(Response {
                    status,
                    headers,
                    body,
                }))
            }
            None => Ok(None),
        }
    }

    /// Store (or replace) an entry, creating the snapshot if needed
    pub fn put(&self, name: &str, key: &str, url: &str, response: &Response) -> Result<()> {
        let headers = serde_json::to_string(&response.headers)
            .map_err(|e| CacheError::Io(format!("Failed to encode headers: {}", e)))?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::ensure_snapshot(&tx, name)?;
        tx.execute(
            "INSERT OR REPLACE INTO snapshot_entries
             (snapshot, request_key, url, status, headers, body, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                name,
                key,
                url,
                response.status,
                headers,
                response.body,
                Utc::now().timestamp_millis()
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Entries of one snapshot, ordered by URL
    pub fn entries(&self, name: &str) -> Result<Vec<EntrySummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT url, status, LENGTH(body), stored_at FROM snapshot_entries
             WHERE snapshot = ?1 ORDER BY url",
        )?;
        let entries = stmt
            .query_map([name], |r| {
                Ok(EntrySummary {
                    url: r.get(0)?,
                    status: r.get(1)?,
                    size_bytes: r.get::<_, i64>(2)? as usize,
                    stored_at: r.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Remove every snapshot
    pub fn clear_all(&self) -> Result<ClearStats> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let entries_removed = tx.execute("DELETE FROM snapshot_entries", [])?;
        let snapshots_removed = tx.execute("DELETE FROM snapshots", [])?;
        tx.commit()?;
        Ok(ClearStats {
            snapshots_removed,
            entries_removed,
        })
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<CacheStats> {
        let conn = self.lock()?;

        let snapshots: i64 = conn.query_row("SELECT COUNT(*) FROM snapshots", [], |r| r.get(0))?;
        let (entries, total_size): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(LENGTH(body)), 0) FROM snapshot_entries",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        Ok(CacheStats {
            snapshots: snapshots as usize,
            entries: entries as usize,
            total_size_bytes: total_size as usize,
        })
    }
}

/// One stored response, without its body
#[derive(Debug, Clone, serde::Serialize)]
pub struct EntrySummary {
    pub url: String,
    pub status: u16,
    pub size_bytes: usize,
    pub stored_at: i64,
}

/// Statistics about a clear operation
#[derive(Debug)]
pub struct ClearStats {
    pub snapshots_removed: usize,
    pub entries_removed: usize,
}

/// Statistics about snapshot storage
#[derive(Debug)]
pub struct CacheStats {
    pub snapshots: usize,
    pub entries: usize,
    pub total_size_bytes: usize,
}

/// One named snapshot, usable as the cache half of a strategy
pub struct Snapshot {
    store: Arc<SnapshotStore>,
    name: String,
}

impl Snapshot {
    pub fn new(store: Arc<SnapshotStore>, name: &str) -> Self {
        Self {
            store,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create the snapshot if it does not exist yet
    pub async fn open(&self) -> Result<()> {
        let store = Arc::clone(&self.store);
        let name = self.name.clone();
        tokio::task::spawn_blocking(move || store.open_snapshot(&name)).await?
    }
}

#[async_trait]
impl ResponseCache for Snapshot {
    async fn lookup(&self, request: &Request) -> Result<Option<Response>> {
        let store = Arc::clone(&self.store);
        let name = self.name.clone();
        let key = request_key(request);
        tokio::task::spawn_blocking(move || store.lookup(&name, &key)).await?
    }

    async fn store(&self, request: &Request, response: Response) -> Result<()> {
        let store = Arc::clone(&self.store);
        let name = self.name.clone();
        let key = request_key(request);
        let url = request.cache_url();
        tokio::task::spawn_blocking(move || store.put(&name, &key, &url, &response)).await?
    }
}
