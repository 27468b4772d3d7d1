//! Caching strategies over an abstract (cache, network) pair
//!
//! Each strategy is a free function so it can be exercised with any
//! [`ResponseCache`] and [`Network`] implementation. Cache read and write
//! failures never fail a request on their own: reads degrade to a miss and
//! writes are logged and dropped.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::classify::Strategy;
use super::request::{Request, Response};
use crate::error::{CacheError, FetchError};

/// The network half of a strategy
#[async_trait]
pub trait Network: Send + Sync {
    /// Issue the request. Any HTTP status is a completed fetch.
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

/// The cache half of a strategy
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn lookup(&self, request: &Request) -> Result<Option<Response>, CacheError>;

    async fn store(&self, request: &Request, response: Response) -> Result<(), CacheError>;
}

/// Where a served response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
}

impl std::fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseSource::Network => write!(f, "network"),
            ResponseSource::Cache => write!(f, "cache"),
        }
    }
}

/// A response handed back to the caller
#[derive(Debug)]
pub struct Served {
    pub response: Response,
    pub source: ResponseSource,
    /// Background refresh started by stale-while-revalidate
    pub revalidation: Option<JoinHandle<()>>,
}

impl Served {
    fn network(response: Response) -> Self {
        Self {
            response,
            source: ResponseSource::Network,
            revalidation: None,
        }
    }

    fn cache(response: Response) -> Self {
        Self {
            response,
            source: ResponseSource::Cache,
            revalidation: None,
        }
    }
}

/// Run `strategy` for `request`
pub async fn respond<C, N>(
    strategy: Strategy,
    cache: &Arc<C>,
    network: &Arc<N>,
    request: &Request,
) -> Result<Served, FetchError>
where
    C: ResponseCache + 'static,
    N: Network + 'static,
{
    match strategy {
        Strategy::StaleWhileRevalidate => stale_while_revalidate(cache, network, request).await,
        Strategy::CacheFirst => cache_first(cache.as_ref(), network.as_ref(), request).await,
        Strategy::NetworkFirst => network_first(cache.as_ref(), network.as_ref(), request).await,
    }
}

/// Serve the cached copy immediately and refresh it in the background.
/// Without a cached copy, wait for the network.
pub async fn stale_while_revalidate<C, N>(
    cache: &Arc<C>,
    network: &Arc<N>,
    request: &Request,
) -> Result<Served, FetchError>
where
    C: ResponseCache + 'static,
    N: Network + 'static,
{
    let cached = lookup(cache.as_ref(), request).await;

    match cached {
        Some(response) => {
            log::debug!("Cache hit (stale-while-revalidate): {}", request.url);
            let cache = Arc::clone(cache);
            let network = Arc::clone(network);
            let request = request.clone();
            let revalidation = tokio::spawn(async move {
                match network.fetch(&request).await {
                    Ok(fresh) => remember(cache.as_ref(), &request, &fresh).await,
                    Err(e) => log::warn!("Revalidation of {} failed: {}", request.url, e),
                }
            });
            Ok(Served {
                response,
                source: ResponseSource::Cache,
                revalidation: Some(revalidation),
            })
        }
        None => {
            log::debug!("Cache miss (stale-while-revalidate): {}", request.url);
            let response = network
                .fetch(request)
                .await
                .map_err(|e| exhausted(request, e))?;
            remember(cache.as_ref(), request, &response).await;
            Ok(Served::network(response))
        }
    }
}

/// Prefer the cached copy; on a miss fetch and keep a copy of a 200
pub async fn cache_first<C, N>(cache: &C, network: &N, request: &Request) -> Result<Served, FetchError>
where
    C: ResponseCache + ?Sized,
    N: Network + ?Sized,
{
    if let Some(response) = lookup(cache, request).await {
        log::debug!("Cache hit (cache-first): {}", request.url);
        return Ok(Served::cache(response));
    }

    log::debug!("Cache miss (cache-first): {}", request.url);
    let response = network
        .fetch(request)
        .await
        .map_err(|e| exhausted(request, e))?;
    remember(cache, request, &response).await;
    Ok(Served::network(response))
}

/// Prefer the network, keeping a copy of a 200; fall back to the cache
pub async fn network_first<C, N>(
    cache: &C,
    network: &N,
    request: &Request,
) -> Result<Served, FetchError>
where
    C: ResponseCache + ?Sized,
    N: Network + ?Sized,
{
    match network.fetch(request).await {
        Ok(response) => {
            remember(cache, request, &response).await;
            Ok(Served::network(response))
        }
        Err(e) => match lookup(cache, request).await {
            Some(response) => {
                log::debug!("Network failed, serving cached {}: {}", request.url, e);
                Ok(Served::cache(response))
            }
            None => {
                log::warn!(
                    "Request failed and no cache available: {}",
                    request.url.path()
                );
                Err(exhausted(request, e))
            }
        },
    }
}

async fn lookup<C: ResponseCache + ?Sized>(cache: &C, request: &Request) -> Option<Response> {
    match cache.lookup(request).await {
        Ok(hit) => hit,
        Err(e) => {
            log::warn!("Cache lookup for {} failed: {}", request.url, e);
            None
        }
    }
}

/// Store a copy of `response` if it is cacheable
async fn remember<C: ResponseCache + ?Sized>(cache: &C, request: &Request, response: &Response) {
    if !response.is_cacheable() {
        return;
    }
    if let Err(e) = cache.store(request, response.clone()).await {
        log::warn!("Failed to cache {}: {}", request.url, e);
    }
}

fn exhausted(request: &Request, cause: FetchError) -> FetchError {
    FetchError::NetworkFailure {
        url: request.url.to_string(),
        reason: cause.to_string(),
    }
}
