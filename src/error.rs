//! Error types for offtask

use thiserror::Error;

/// Result type alias for offtask operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Interactive prompt error: {0}")]
    Dialoguer(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    Invalid(String),
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Dialoguer(err.to_string())
    }
}

/// Task store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Task storage unavailable: {0}")]
    Io(String),

    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Task id already exists: {0}")]
    DuplicateKey(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Io(format!("Storage task aborted: {}", err))
    }
}

/// Request handling errors raised by the offline cache controller
#[derive(Debug, Error)]
pub enum FetchError {
    /// A single network attempt failed before a response arrived
    #[error("Network error: {0}")]
    Transport(String),

    /// Every source for the request (network and cache) was exhausted
    #[error("Network request failed for {url}: {reason}")]
    NetworkFailure { url: String, reason: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Transport("Request timed out".to_string())
        } else if err.is_connect() {
            FetchError::Transport("Failed to connect".to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Snapshot storage and lifecycle errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(String),

    #[error("Invalid lifecycle transition: {0}")]
    Lifecycle(String),
}

impl From<rusqlite::Error> for CacheError {
    fn from(err: rusqlite::Error) -> Self {
        CacheError::Io(err.to_string())
    }
}

impl From<tokio::task::JoinError> for CacheError {
    fn from(err: tokio::task::JoinError) -> Self {
        CacheError::Io(format!("Cache task aborted: {}", err))
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found. Run `offtask config init` to create one.")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
