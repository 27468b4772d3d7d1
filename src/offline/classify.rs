//! Request classification
//!
//! Decides, per request, whether the controller intercepts it and which
//! caching strategy applies.

use reqwest::{Method, Url};
use serde::Serialize;

use super::request::Request;

/// Path suffixes served cache-first
pub const STATIC_EXTENSIONS: &[&str] = &[
    "js", "css", "png", "jpg", "jpeg", "svg", "gif", "webp", "woff", "woff2", "ttf", "eot",
];

/// Caching strategy for an intercepted request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// HTML navigations
    StaleWhileRevalidate,
    /// Static assets
    CacheFirst,
    /// Everything else
    NetworkFirst,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::StaleWhileRevalidate => write!(f, "stale-while-revalidate"),
            Strategy::CacheFirst => write!(f, "cache-first"),
            Strategy::NetworkFirst => write!(f, "network-first"),
        }
    }
}

/// Outcome of classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not intercepted: goes straight to the network, never cached
    Passthrough,
    Intercept(Strategy),
}

/// Classify from the raw request facts.
///
/// `accept` is the accept header; `path` is the URL path (no query).
pub fn classify(method: &Method, same_origin: bool, accept: Option<&str>, path: &str) -> Route {
    if *method != Method::GET || !same_origin {
        return Route::Passthrough;
    }

    if accept.is_some_and(|a| a.contains("text/html")) {
        return Route::Intercept(Strategy::StaleWhileRevalidate);
    }

    if has_static_extension(path) {
        return Route::Intercept(Strategy::CacheFirst);
    }

    Route::Intercept(Strategy::NetworkFirst)
}

/// Classify a request against the controller's origin
pub fn route(request: &Request, origin: &Url) -> Route {
    classify(
        &request.method,
        request.url.origin() == origin.origin(),
        request.accept.as_deref(),
        request.url.path(),
    )
}

fn has_static_extension(path: &str) -> bool {
    let file = path.rsplit('/').next().unwrap_or(path);
    file.rsplit_once('.').is_some_and(|(_, ext)| {
        STATIC_EXTENSIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext))
    })
}
