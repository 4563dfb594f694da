//! Transport for protected resources
//!
//! [`ResourceClient`] is the seam between the negotiator and the network.
//! Implementations report every HTTP response, whatever its status, and
//! only fail on real transport problems (DNS, refused connection, timeout).

use crate::types::wire;
use crate::{Result, X402Error};
use async_trait::async_trait;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Status and body of a resource response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response body as received
    pub body: String,
}

impl ResourceResponse {
    /// Create a new response
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether this response is a payment challenge
    pub fn is_payment_required(&self) -> bool {
        self.status == wire::PAYMENT_REQUIRED
    }

    /// Parse the body as JSON
    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Performs requests against protected resources
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Call `path` and return the response, whatever its status
    async fn call(&self, method: Method, path: &str, headers: HeaderMap) -> Result<ResourceResponse>;
}

/// [`ResourceClient`] backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpResourceClient {
    base_url: Url,
    client: Client,
}

impl HttpResourceClient {
    /// Create a client for the server at `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, None)
    }

    /// Create a client with an optional per-request timeout
    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| X402Error::config(format!("Invalid server URL '{}': {}", base_url, e)))?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(X402Error::config(
                "Server URL must start with http:// or https://",
            ));
        }

        let mut client_builder = Client::builder();

        if let Some(timeout) = timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let client = client_builder
            .build()
            .map_err(|e| X402Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { base_url, client })
    }

    /// Base URL of the server
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for a resource path
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// `GET /api/health`
    pub async fn health(&self) -> Result<ResourceResponse> {
        self.call(Method::GET, "/api/health", HeaderMap::new()).await
    }

    /// `GET /api/free`
    pub async fn free(&self) -> Result<ResourceResponse> {
        self.call(Method::GET, "/api/free", HeaderMap::new()).await
    }
}

#[async_trait]
impl ResourceClient for HttpResourceClient {
    async fn call(&self, method: Method, path: &str, headers: HeaderMap) -> Result<ResourceResponse> {
        let url = self.url_for(path);
        tracing::info!("Calling {} {}", method, path);

        let response = self
            .client
            .request(method, &url)
            .header(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )
            .headers(headers)
            .send()
            .await
            .inspect_err(|e| tracing::error!("Request to {} failed: {}", url, e))?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            tracing::info!("Response {}: OK", status.as_u16());
        } else {
            tracing::warn!("Response {}", status.as_u16());
        }

        Ok(ResourceResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[test]
    fn test_client_rejects_invalid_url() {
        assert!(matches!(
            HttpResourceClient::new("not a url"),
            Err(X402Error::Config { .. })
        ));
        assert!(matches!(
            HttpResourceClient::new("ftp://example.com"),
            Err(X402Error::Config { .. })
        ));
    }

    #[test]
    fn test_url_for_joins_paths() {
        let client = HttpResourceClient::new("http://127.0.0.1:3000/").unwrap();
        assert_eq!(client.url_for("/api/paid"), "http://127.0.0.1:3000/api/paid");
        assert_eq!(client.url_for("api/free"), "http://127.0.0.1:3000/api/free");
    }

    #[tokio::test]
    async fn test_call_returns_non_success_status() {
        let mut server = Server::new_async().await;
        let body = json!({
            "error": "PaymentRequired",
            "paymentRequirements": {
                "recipient": "R1",
                "amount": 50000000000u64,
                "currency": "PAS",
                "network": "paseo"
            }
        })
        .to_string();
        let _mock = server
            .mock("GET", "/api/paid")
            .with_status(402)
            .with_header("content-type", "application/json")
            .with_body(&body)
            .create_async()
            .await;

        let client = HttpResourceClient::new(&server.url()).unwrap();
        let response = client
            .call(Method::GET, "/api/paid", HeaderMap::new())
            .await
            .unwrap();

        assert!(response.is_payment_required());
        assert_eq!(response.body, body);
    }

    #[tokio::test]
    async fn test_call_forwards_payment_header() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/paid")
            .match_header(wire::PAYMENT_HEADER, "0xdeadbeef")
            .match_header("content-type", Matcher::Exact("application/json".to_string()))
            .with_status(200)
            .with_body(json!({"transaction_hash": "0xabc"}).to_string())
            .create_async()
            .await;

        let client = HttpResourceClient::new(&server.url()).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(wire::PAYMENT_HEADER, HeaderValue::from_static("0xdeadbeef"));
        let response = client.call(Method::GET, "/api/paid", headers).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json().unwrap()["transaction_hash"], "0xabc");
    }

    #[tokio::test]
    async fn test_health_and_free_endpoints() {
        let mut server = Server::new_async().await;
        let _health = server
            .mock("GET", "/api/health")
            .with_status(200)
            .with_body(json!({"status": "ok", "network": "paseo"}).to_string())
            .create_async()
            .await;
        let _free = server
            .mock("GET", "/api/free")
            .with_status(200)
            .with_body(json!({"message": "This is a free endpoint"}).to_string())
            .create_async()
            .await;

        let client = HttpResourceClient::new(&server.url()).unwrap();
        assert_eq!(client.health().await.unwrap().json().unwrap()["status"], "ok");
        assert_eq!(client.free().await.unwrap().status, StatusCode::OK);
    }

    #[test]
    fn test_json_body_errors_are_json_errors() {
        let response = ResourceResponse::new(StatusCode::OK, "granted");
        assert!(matches!(response.json(), Err(X402Error::Json(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = HttpResourceClient::new(&format!("http://127.0.0.1:{}", port)).unwrap();
        let err = client
            .call(Method::GET, "/api/paid", HeaderMap::new())
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("/api/paid"));
    }
}
