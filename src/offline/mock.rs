//! Test doubles for the offline strategies
//!
//! `MockNetwork` serves canned responses by path and can be switched offline;
//! `MemoryCache` is an in-memory [`ResponseCache`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::key::request_key;
use super::request::{Request, Response};
use super::strategy::{Network, ResponseCache};
use crate::error::{CacheError, FetchError};

/// Network double keyed by URL path
pub struct MockNetwork {
    /// Responses by path
    responses: Arc<Mutex<HashMap<String, Response>>>,
    /// Whether fetches reach the responses at all
    online: AtomicBool,
    /// Fetch count by path
    calls: Arc<Mutex<HashMap<String, usize>>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            online: AtomicBool::new(true),
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Serve `response` for `path`
    pub fn with_response(self, path: &str, response: Response) -> Self {
        self.responses
            .try_lock()
            .expect("builder used before sharing")
            .insert(path.to_string(), response);
        self
    }

    pub async fn set_response(&self, path: &str, response: Response) {
        self.responses
            .lock()
            .await
            .insert(path.to_string(), response);
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub async fn call_count(&self, path: &str) -> usize {
        self.calls.lock().await.get(path).copied().unwrap_or(0)
    }

    pub async fn total_calls(&self) -> usize {
        self.calls.lock().await.values().sum()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let path = request.url.path().to_string();
        *self.calls.lock().await.entry(path.clone()).or_default() += 1;

        if !self.online.load(Ordering::SeqCst) {
            return Err(FetchError::Transport("offline".to_string()));
        }

        match self.responses.lock().await.get(&path) {
            Some(response) => Ok(response.clone()),
            None => Ok(Response::new(404, "not found")),
        }
    }
}

/// In-memory response cache
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Response>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, request: &Request, response: Response) {
        self.entries
            .lock()
            .await
            .insert(request_key(request), response);
    }

    pub async fn get(&self, request: &Request) -> Option<Response> {
        self.entries.lock().await.get(&request_key(request)).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn lookup(&self, request: &Request) -> Result<Option<Response>, CacheError> {
        Ok(self.get(request).await)
    }

    async fn store(&self, request: &Request, response: Response) -> Result<(), CacheError> {
        self.insert(request, response).await;
        Ok(())
    }
}
