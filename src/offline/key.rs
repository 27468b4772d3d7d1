//! Snapshot entry keys using SHA-256 hashes

use sha2::{Digest, Sha256};

use super::request::Request;

/// Deterministic snapshot key for a request.
///
/// Hashes the method and the URL (fragment removed), so `/a#x` and `/a#y`
/// share an entry while `/a?v=1` and `/a?v=2` do not.
pub fn request_key(request: &Request) -> String {
    key_for(request.method.as_str(), &request.cache_url())
}

/// Key for a method and an already-normalized URL
pub fn key_for(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"|");
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Url;

    fn req(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[test]
    fn test_key_deterministic() {
        assert_eq!(
            request_key(&req("http://localhost/app.js")),
            request_key(&req("http://localhost/app.js"))
        );
    }

    #[test]
    fn test_key_ignores_fragment_and_accept() {
        let plain = req("http://localhost/");
        let nav = Request::navigate(Url::parse("http://localhost/#list").unwrap());
        assert_eq!(request_key(&plain), request_key(&nav));
    }

    #[test]
    fn test_key_distinguishes_query() {
        assert_ne!(
            request_key(&req("http://localhost/api?page=1")),
            request_key(&req("http://localhost/api?page=2"))
        );
    }

    #[test]
    fn test_key_is_hex_sha256() {
        let key = key_for("get", "http://localhost/");
        assert_eq!(key.len(), 64);
        assert_eq!(key, key_for("GET", "http://localhost/"));
    }
}
