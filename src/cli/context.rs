//! Command execution context
//!
//! Loads configuration once and builds the stores and controller commands
//! work against.

use std::sync::Arc;

use crate::cli::{GlobalOptions, OutputFormat};
use crate::config::Config;
use crate::error::Result;
use crate::offline::{HttpNetwork, OfflineController, SnapshotStore};
use crate::store::TaskStore;

/// Task database file name inside the data directory
const TASK_DB_FILE: &str = "tasks.db";

/// Context for command execution: loaded config plus output preference
pub struct CommandContext {
    pub config: Config,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Load configuration from `--config` or the default location
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let config = Config::load_at(opts.config_ref())?;
        log::debug!(
            "Using origin {} and data dir {:?}",
            config.origin,
            config.data_dir()
        );
        Ok(Self {
            config,
            format: opts.format,
        })
    }

    /// Task store over `<data_dir>/tasks.db`, initialized
    pub async fn task_store(&self) -> Result<TaskStore> {
        let data_dir = self.config.data_dir()?;
        std::fs::create_dir_all(&data_dir)?;

        let store = TaskStore::new(data_dir.join(TASK_DB_FILE));
        store.initialize().await?;
        Ok(store)
    }

    /// Snapshot storage inside the data directory
    pub fn snapshot_store(&self) -> Result<Arc<SnapshotStore>> {
        let data_dir = self.config.data_dir()?;
        Ok(Arc::new(SnapshotStore::open_at(&data_dir)?))
    }

    /// Controller for the configured origin, backed by real HTTP
    pub fn controller(&self) -> Result<OfflineController<HttpNetwork>> {
        let network = HttpNetwork::new(self.config.cache.request_timeout())?;
        Ok(OfflineController::new(
            self.config.origin_url()?,
            self.config.cache.clone(),
            self.snapshot_store()?,
            Arc::new(network),
        ))
    }
}
