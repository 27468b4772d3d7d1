//! Offline cache controller lifecycle
//!
//! The controller moves through `Installing -> Waiting -> Activating -> Active`.
//! Installation warms the current-version snapshot; activation drops every
//! other snapshot and starts intercepting requests. A `SKIP_WAITING` message
//! (or `skip_waiting_on_install`) moves straight from installed to activating.
//!
//! Each lifecycle step is an async call that returns only once its work is
//! done, and steps are serialized so two triggers never activate twice.

use futures::future::join_all;
use reqwest::Url;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};

use super::classify::{Route, route};
use super::request::{Request, Response};
use super::snapshot::{Snapshot, SnapshotStore};
use super::strategy::{self, Network, ResponseCache, Served};
use crate::config::CacheSettings;
use crate::error::{CacheError, FetchError};

/// Lifecycle states of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecycleState {
    Installing,
    /// Installed, not yet controlling requests
    Waiting,
    Activating,
    Active,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Installing => "installing",
            LifecycleState::Waiting => "waiting",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
        };
        write!(f, "{}", name)
    }
}

/// Messages the foreground may post to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    SkipWaiting,
}

impl ControlMessage {
    /// Parse `{"type": "..."}`. Unrecognized types yield `None`.
    pub fn parse(json: &str) -> Result<Option<Self>, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Ok(match value.get("type").and_then(|t| t.as_str()) {
            Some("SKIP_WAITING") => Some(ControlMessage::SkipWaiting),
            _ => None,
        })
    }
}

/// Result of pre-populating the snapshot
#[derive(Debug, Default, Serialize)]
pub struct InstallReport {
    pub snapshot: String,
    pub stored: Vec<String>,
    pub failed: Vec<String>,
    /// Present when installation went straight on to activation
    pub activation: Option<ActivationReport>,
}

/// Result of activation
#[derive(Debug, Default, Serialize)]
pub struct ActivationReport {
    /// Stale snapshots removed
    pub deleted: Vec<String>,
}

/// Intercepts requests for one origin and owns the versioned snapshots
pub struct OfflineController<N: Network + 'static> {
    origin: Url,
    settings: CacheSettings,
    snapshots: Arc<SnapshotStore>,
    network: Arc<N>,
    state: RwLock<LifecycleState>,
    skip_waiting: AtomicBool,
    controlling: AtomicBool,
    /// Serializes install/activate
    lifecycle: Mutex<()>,
}

impl<N: Network + 'static> OfflineController<N> {
    pub fn new(
        origin: Url,
        settings: CacheSettings,
        snapshots: Arc<SnapshotStore>,
        network: Arc<N>,
    ) -> Self {
        let skip_waiting = settings.skip_waiting_on_install;
        Self {
            origin,
            settings,
            snapshots,
            network,
            state: RwLock::new(LifecycleState::Installing),
            skip_waiting: AtomicBool::new(skip_waiting),
            controlling: AtomicBool::new(false),
            lifecycle: Mutex::new(()),
        }
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    /// Whether requests are being intercepted
    pub fn is_controlling(&self) -> bool {
        self.controlling.load(Ordering::SeqCst)
    }

    pub fn version(&self) -> &str {
        &self.settings.version
    }

    /// The snapshot tagged with the running version; the only one ever written
    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        Arc::new(Snapshot::new(
            Arc::clone(&self.snapshots),
            &self.settings.version,
        ))
    }

    async fn transition(&self, to: LifecycleState) {
        let mut state = self.state.write().await;
        log::info!("Offline controller {} -> {}", *state, to);
        *state = to;
    }

    async fn expect_state(&self, expected: LifecycleState, event: &str) -> Result<(), CacheError> {
        let current = self.state().await;
        if current != expected {
            return Err(CacheError::Lifecycle(format!(
                "cannot {} while {} (expected {})",
                event, current, expected
            )));
        }
        Ok(())
    }

    /// Open the current snapshot and warm it with the precache manifest.
    ///
    /// Resource failures are logged and skipped. Ends in `Waiting`, or in
    /// `Active` when skip-waiting is set.
    pub async fn install(&self) -> Result<InstallReport, CacheError> {
        let _guard = self.lifecycle.lock().await;
        self.expect_state(LifecycleState::Installing, "install")
            .await?;

        log::info!("Installing offline cache {}", self.settings.version);
        let snapshot = self.current_snapshot();
        snapshot.open().await?;

        let mut report = self.precache(&snapshot).await;

        if self.skip_waiting.load(Ordering::SeqCst) {
            report.activation = Some(self.run_activation().await?);
        } else {
            self.transition(LifecycleState::Waiting).await;
        }

        Ok(report)
    }

    async fn precache(&self, snapshot: &Snapshot) -> InstallReport {
        let fetches = self.settings.precache.iter().map(|path| async move {
            let outcome = match self.origin.join(path) {
                Ok(url) => self.precache_one(snapshot, Request::get(url)).await,
                Err(e) => Err(format!("invalid path: {}", e)),
            };
            (path.clone(), outcome)
        });

        let mut report = InstallReport {
            snapshot: snapshot.name().to_string(),
            ..InstallReport::default()
        };

        for (path, outcome) in join_all(fetches).await {
            match outcome {
                Ok(()) => report.stored.push(path),
                Err(reason) => {
                    log::warn!("Failed to precache {}: {}", path, reason);
                    report.failed.push(path);
                }
            }
        }

        log::info!(
            "Precached {}/{} resources",
            report.stored.len(),
            self.settings.precache.len()
        );
        report
    }

    async fn precache_one(&self, snapshot: &Snapshot, request: Request) -> Result<(), String> {
        let response: Response = self
            .network
            .fetch(&request)
            .await
            .map_err(|e| e.to_string())?;
        if !response.is_cacheable() {
            return Err(format!("status {}", response.status));
        }
        snapshot
            .store(&request, response)
            .await
            .map_err(|e| e.to_string())
    }

    /// Activate a waiting controller
    pub async fn activate(&self) -> Result<ActivationReport, CacheError> {
        let _guard = self.lifecycle.lock().await;
        self.expect_state(LifecycleState::Waiting, "activate")
            .await?;
        self.run_activation().await
    }

    /// Drop stale snapshots and start controlling. Caller holds the lifecycle lock.
    ///
    /// A failed cleanup puts the controller back in `Waiting` so activation can
    /// be retried.
    async fn run_activation(&self) -> Result<ActivationReport, CacheError> {
        self.transition(LifecycleState::Activating).await;

        let deleted = match self.delete_stale_snapshots().await {
            Ok(deleted) => deleted,
            Err(e) => {
                log::warn!("Activation of {} failed: {}", self.settings.version, e);
                self.transition(LifecycleState::Waiting).await;
                return Err(e);
            }
        };

        self.controlling.store(true, Ordering::SeqCst);
        self.transition(LifecycleState::Active).await;

        Ok(ActivationReport { deleted })
    }

    async fn delete_stale_snapshots(&self) -> Result<Vec<String>, CacheError> {
        let store = Arc::clone(&self.snapshots);
        let current = self.settings.version.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<String>, CacheError> {
            let mut deleted = Vec::new();
            for name in store.keys()? {
                if name != current {
                    log::info!("Deleting old cache: {}", name);
                    store.delete(&name)?;
                    deleted.push(name);
                }
            }
            Ok(deleted)
        })
        .await?
    }

    /// Handle a control message from the foreground.
    ///
    /// `SKIP_WAITING` activates a waiting controller immediately; sent during
    /// installation it makes installation activate on completion.
    pub async fn handle_message(
        &self,
        message: ControlMessage,
    ) -> Result<Option<ActivationReport>, CacheError> {
        match message {
            ControlMessage::SkipWaiting => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                let _guard = self.lifecycle.lock().await;
                if self.state().await == LifecycleState::Waiting {
                    return self.run_activation().await.map(Some);
                }
                Ok(None)
            }
        }
    }

    /// Parse and handle a raw JSON control message
    pub async fn post_message(&self, json: &str) -> crate::error::Result<Option<ActivationReport>> {
        match ControlMessage::parse(json)? {
            Some(message) => Ok(self.handle_message(message).await?),
            None => {
                log::debug!("Ignoring unrecognized control message: {}", json);
                Ok(None)
            }
        }
    }

    /// Pick up an earlier installation of the current version.
    ///
    /// A fresh controller whose snapshot already exists moves to `Waiting`
    /// without fetching anything. Returns whether the snapshot was installed.
    pub async fn resume(&self) -> Result<bool, CacheError> {
        let _guard = self.lifecycle.lock().await;
        if self.state().await != LifecycleState::Installing {
            return Ok(true);
        }

        let store = Arc::clone(&self.snapshots);
        let version = self.settings.version.clone();
        let installed = tokio::task::spawn_blocking(move || store.has(&version)).await??;

        if installed {
            log::debug!("Snapshot {} already installed", self.settings.version);
            self.transition(LifecycleState::Waiting).await;
        }
        Ok(installed)
    }

    /// Bring a freshly started controller to `Active`.
    ///
    /// Installs when the current snapshot does not exist yet; otherwise the
    /// previous install is reused and only activation runs.
    pub async fn ensure_active(&self) -> Result<Option<InstallReport>, CacheError> {
        if self.state().await == LifecycleState::Active {
            return Ok(None);
        }

        let report = if self.resume().await? {
            None
        } else {
            Some(self.install().await?)
        };

        if self.state().await == LifecycleState::Waiting {
            self.activate().await?;
        }

        let state = self.state().await;
        if state != LifecycleState::Active {
            return Err(CacheError::Lifecycle(format!(
                "controller ended in {} instead of active",
                state
            )));
        }
        Ok(report)
    }

    /// Answer a request.
    ///
    /// Until the controller is active, and for requests it does not intercept
    /// (non-GET, other origins), the request goes straight to the network and
    /// nothing is cached.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Served, FetchError> {
        let route = if self.is_controlling() {
            route(request, &self.origin)
        } else {
            Route::Passthrough
        };

        match route {
            Route::Passthrough => {
                log::debug!("Passthrough: {} {}", request.method, request.url);
                let response = self.network.fetch(request).await?;
                Ok(Served {
                    response,
                    source: strategy::ResponseSource::Network,
                    revalidation: None,
                })
            }
            Route::Intercept(kind) => {
                log::debug!("{} via {}", request.url, kind);
                strategy::respond(
                    kind,
                    &self.current_snapshot(),
                    &self.network,
                    request,
                )
                .await
            }
        }
    }
}
