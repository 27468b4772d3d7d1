//! HTTP network capability backed by reqwest

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use reqwest::header::ACCEPT;
use std::time::Duration;

use super::request::{Request, Response};
use super::strategy::Network;
use crate::error::FetchError;

/// Plain HTTP fetcher; buffers the whole body
pub struct HttpNetwork {
    http: HttpClient,
}

impl HttpNetwork {
    /// Create a client. Without `timeout`, hung requests are left to the OS.
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = HttpClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone());
        if let Some(ref accept) = request.accept {
            builder = builder.header(ACCEPT, accept);
        }

        let response = builder.send().await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        log::debug!("{} {} -> {}", request.method, request.url, status);
        Ok(Response {
            headers,
            ..Response::new(status, body)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Url;

    #[tokio::test]
    async fn test_fetch_buffers_response() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/app.js")
            .with_status(200)
            .with_header("content-type", "text/javascript")
            .with_body("console.log(1)")
            .create_async()
            .await;

        let network = HttpNetwork::new(None).unwrap();
        let url = Url::parse(&server.url()).unwrap().join("/app.js").unwrap();
        let response = network.fetch(&Request::get(url)).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"console.log(1)");
        assert_eq!(response.header("content-type"), Some("text/javascript"));
    }

    #[tokio::test]
    async fn test_fetch_forwards_accept() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/")
            .match_header("accept", mockito::Matcher::Regex("text/html".to_string()))
            .with_status(200)
            .with_body("<html></html>")
            .create_async()
            .await;

        let network = HttpNetwork::new(None).unwrap();
        let url = Url::parse(&server.url()).unwrap();
        let response = network.fetch(&Request::navigate(url)).await.unwrap();

        assert_eq!(response.status, 200);
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_a_response() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/missing")
            .with_status(404)
            .create_async()
            .await;

        let network = HttpNetwork::new(None).unwrap();
        let url = Url::parse(&server.url())
            .unwrap()
            .join("/api/missing")
            .unwrap();
        let response = network.fetch(&Request::get(url)).await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let network = HttpNetwork::new(Some(Duration::from_secs(5))).unwrap();
        let url = Url::parse("http://127.0.0.1:1/").unwrap();

        let err = network.fetch(&Request::get(url)).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
