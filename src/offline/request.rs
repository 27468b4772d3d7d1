//! Intercepted requests and buffered responses

use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};

/// An outgoing request seen by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    /// Value of the `accept` header, if any
    pub accept: Option<String>,
}

impl Request {
    /// Plain GET with no accept hint
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            accept: None,
        }
    }

    /// Document navigation (GET accepting HTML)
    pub fn navigate(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            accept: Some("text/html,application/xhtml+xml,*/*;q=0.8".to_string()),
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// URL used for cache matching (fragment dropped)
    pub fn cache_url(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.to_string()
    }
}

/// A fully buffered response. Cloning it gives an independent copy, so one copy
/// can go to the cache while the other is returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    #[cfg(test)]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Only 200 responses are written to a snapshot
    pub fn is_cacheable(&self) -> bool {
        self.status == 200
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
