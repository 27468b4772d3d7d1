//! SQLite-backed durable task storage
//!
//! One `tasks` table keyed by id, with non-unique indexes on `created_at` and
//! `completed`. Callers reach it through [`DbHandle`], which opens the database
//! at most once per process no matter how many callers race on first use.

use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

use super::task::{Task, TaskPatch};
use crate::error::StoreError;

/// Schema version stored in `PRAGMA user_version`
const SCHEMA_VERSION: i32 = 1;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at);
CREATE INDEX IF NOT EXISTS idx_tasks_completed ON tasks(completed);
"#;

const TASK_COLUMNS: &str = "id, title, description, completed, created_at, updated_at";

type Result<T> = std::result::Result<T, StoreError>;

/// Durable task table
pub struct TaskDb {
    conn: Mutex<Connection>,
}

impl TaskDb {
    /// Open (creating if needed) the task database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("Failed to create data dir: {}", e)))?;
        }

        let conn = Connection::open(path)?;
        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create the schema if absent. Safe to run against an existing database.
    fn migrate(conn: &Connection) -> Result<()> {
        let version: i32 = conn.pragma_query_value(None, "user_version", |r| r.get(0))?;

        if version > SCHEMA_VERSION {
            return Err(StoreError::Io(format!(
                "Task database schema {} is newer than supported {}",
                version, SCHEMA_VERSION
            )));
        }

        if version < SCHEMA_VERSION {
            log::info!(
                "Upgrading task schema from version {} to {}",
                version,
                SCHEMA_VERSION
            );
        }

        // IF NOT EXISTS keeps this idempotent even when user_version was lost
        conn.execute_batch(SCHEMA)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Io(format!("Lock poisoned: {}", e)))
    }

    fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
        Ok(Task {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            completed: row.get::<_, i64>(3)? != 0,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    /// All tasks, most recently created first.
    ///
    /// Walks `idx_tasks_created_at` in its natural ascending order and reverses.
    pub fn list_recent(&self) -> Result<Vec<Task>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tasks INDEXED BY idx_tasks_created_at
             WHERE created_at >= 0
             ORDER BY created_at ASC, rowid ASC",
            TASK_COLUMNS
        ))?;
        let mut tasks = stmt
            .query_map([], Self::row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        tasks.reverse();
        Ok(tasks)
    }

    /// Tasks with the given completion flag, most recently created first
    pub fn list_by_completion(&self, completed: bool) -> Result<Vec<Task>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tasks INDEXED BY idx_tasks_completed
             WHERE completed = ?1
             ORDER BY created_at DESC, rowid DESC",
            TASK_COLUMNS
        ))?;
        let tasks = stmt
            .query_map([completed as i64], Self::row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    pub fn get(&self, id: &str) -> Result<Option<Task>> {
        let conn = self.lock()?;
        let task = conn
            .query_row(
                &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
                [id],
                Self::row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    /// Insert a new task; an existing id is a `DuplicateKey` error
    pub fn insert(&self, task: &Task) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO tasks (id, title, description, completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                task.id,
                task.title,
                task.description,
                task.completed as i64,
                task.created_at,
                task.updated_at
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.code == ErrorCode::ConstraintViolation =>
            {
                StoreError::DuplicateKey(task.id.clone())
            }
            other => StoreError::from(other),
        })?;
        Ok(())
    }

    /// Read, merge and write back one task inside a single transaction
    pub fn update(&self, id: &str, patch: &TaskPatch, now: i64) -> Result<Task> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let existing = tx
            .query_row(
                &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
                [id],
                Self::row_to_task,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let updated = existing.merged(patch, now);
        tx.execute(
            "UPDATE tasks SET title = ?2, description = ?3, completed = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                updated.id,
                updated.title,
                updated.description,
                updated.completed as i64,
                updated.updated_at
            ],
        )?;
        tx.commit()?;

        Ok(updated)
    }

    /// Delete a task. Returns whether a row was removed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    /// Delete every task. Returns the number removed.
    pub fn clear(&self) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM tasks", [])?;
        Ok(deleted)
    }
}

/// Lazily opened, process-wide handle to the task database.
///
/// Concurrent first callers all wait on the same open; the database is never
/// opened twice through one handle.
pub struct DbHandle {
    path: PathBuf,
    db: OnceCell<Arc<TaskDb>>,
}

impl DbHandle {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            db: OnceCell::new(),
        }
    }

    /// Open the database on first use and return the shared handle
    pub async fn get(&self) -> Result<Arc<TaskDb>> {
        let db = self
            .db
            .get_or_try_init(|| async {
                let path = self.path.clone();
                log::debug!("Opening task database at {}", path.display());
                let db = tokio::task::spawn_blocking(move || TaskDb::open(&path)).await??;
                Ok::<_, StoreError>(Arc::new(db))
            })
            .await?;
        Ok(Arc::clone(db))
    }

    /// Run a blocking storage call off the async runtime
    pub async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&TaskDb) -> Result<T> + Send + 'static,
    {
        let db = self.get().await?;
        tokio::task::spawn_blocking(move || f(&db)).await?
    }
}
