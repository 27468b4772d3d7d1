//! Local durable task store
//!
//! [`TaskStore`] is the CRUD surface the front end calls. Every mutation is
//! committed to SQLite first; the in-memory [`TaskView`] only changes after the
//! commit succeeds, so a failed write never leaves the view ahead of disk.

pub mod db;
pub mod task;

use std::path::PathBuf;
use tokio::sync::{Mutex, RwLock};

use crate::error::StoreError;

pub use db::DbHandle;
pub use task::{Task, TaskPatch};

type Result<T> = std::result::Result<T, StoreError>;

/// What the front end renders: current tasks, loading flag, last load error
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskView {
    pub tasks: Vec<Task>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Async CRUD layer over the durable task table.
///
/// Construct once at startup and pass it to whatever needs it; the
/// database itself is opened on first use.
pub struct TaskStore {
    db: DbHandle,
    view: RwLock<TaskView>,
    /// Held across a durable call and the view change that follows it, so a
    /// reload never overwrites a mutation that committed while it was reading
    sync: Mutex<()>,
    id_source: fn() -> String,
}

impl TaskStore {
    /// Create a store backed by the database file at `path`
    pub fn new(path: PathBuf) -> Self {
        Self {
            db: DbHandle::new(path),
            view: RwLock::new(TaskView::default()),
            sync: Mutex::new(()),
            id_source: task::generate_id,
        }
    }

    /// Replace the id generator
    #[cfg(test)]
    pub fn with_id_source(mut self, id_source: fn() -> String) -> Self {
        self.id_source = id_source;
        self
    }

    /// Open the database (creating the schema if absent). Idempotent.
    pub async fn initialize(&self) -> Result<()> {
        self.db.get().await.map(|_| ())
    }

    /// Snapshot of the in-memory view
    pub async fn view(&self) -> TaskView {
        self.view.read().await.clone()
    }

    /// Load every task, most recently created first, and refresh the view
    pub async fn list(&self) -> Result<Vec<Task>> {
        let _sync = self.sync.lock().await;
        self.view.write().await.loading = true;

        let result = self.db.run(|db| db.list_recent()).await;

        let mut view = self.view.write().await;
        view.loading = false;
        match result {
            Ok(tasks) => {
                view.tasks = tasks.clone();
                view.error = None;
                Ok(tasks)
            }
            Err(e) => {
                log::warn!("Failed to load tasks: {}", e);
                view.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Tasks filtered by completion flag. Does not touch the view.
    pub async fn list_by_completion(&self, completed: bool) -> Result<Vec<Task>> {
        self.db.run(move |db| db.list_by_completion(completed)).await
    }

    /// Look up one task by id
    pub async fn get(&self, id: &str) -> Result<Option<Task>> {
        let id = id.to_string();
        self.db.run(move |db| db.get(&id)).await
    }

    /// Create and persist a new task.
    ///
    /// Title and description limits are the caller's to enforce.
    pub async fn add(&self, title: &str, description: &str) -> Result<Task> {
        let _sync = self.sync.lock().await;
        let task = Task::new((self.id_source)(), title, description, task::now_millis());

        let to_insert = task.clone();
        self.db.run(move |db| db.insert(&to_insert)).await?;
        log::debug!("Added task {}", task.id);

        self.view.write().await.tasks.insert(0, task.clone());
        Ok(task)
    }

    /// Merge `patch` over an existing task and persist it
    pub async fn update(&self, id: &str, patch: TaskPatch) -> Result<Task> {
        let id = id.to_string();
        let _sync = self.sync.lock().await;
        let now = task::now_millis();
        let updated = self.db.run(move |db| db.update(&id, &patch, now)).await?;
        log::debug!("Updated task {}", updated.id);

        let mut view = self.view.write().await;
        if let Some(slot) = view.tasks.iter_mut().find(|t| t.id == updated.id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    /// Remove a task. Removing an unknown id succeeds without effect.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let owned = id.to_string();
        let _sync = self.sync.lock().await;
        let removed = self.db.run(move |db| db.delete(&owned)).await?;
        if !removed {
            log::debug!("Delete of unknown task {} ignored", id);
        }

        self.view.write().await.tasks.retain(|t| t.id != id);
        Ok(())
    }

    /// Remove every task
    pub async fn clear_all(&self) -> Result<usize> {
        let _sync = self.sync.lock().await;
        let removed = self.db.run(|db| db.clear()).await?;
        self.view.write().await.tasks.clear();
        Ok(removed)
    }
}
