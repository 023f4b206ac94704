//! HTTP JSON-RPC client backed by `reqwest`.

use std::time::Duration;

use async_trait::async_trait;

use chaincall_core::error::TransportError;
use chaincall_core::request::{JsonRpcRequest, JsonRpcResponse};
use chaincall_core::transport::RpcTransport;

/// Configuration for `HttpRpcClient`.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub request_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP JSON-RPC client for one endpoint.
pub struct HttpRpcClient {
    url: String,
    http: reqwest::Client,
    request_timeout: Duration,
}

impl HttpRpcClient {
    /// Create a new client for the given JSON-RPC endpoint URL.
    pub fn new(url: impl Into<String>, config: HttpClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(url, http, config.request_timeout))
    }

    /// Wrap an existing `reqwest::Client` so connections share its pool.
    pub fn with_client(url: impl Into<String>, http: reqwest::Client, request_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            http,
            request_timeout,
        }
    }

    /// Create with default configuration.
    pub fn default_for(url: impl Into<String>) -> Result<Self, TransportError> {
        Self::new(url, HttpClientConfig::default())
    }

    fn map_reqwest(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                ms: self.request_timeout.as_millis() as u64,
            }
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

/// A body that arrived but is not a JSON-RPC response is the node's fault,
/// not the connection's.
fn parse_body(body: &[u8]) -> Result<JsonRpcResponse, TransportError> {
    Ok(serde_json::from_slice(body)?)
}

#[async_trait]
impl RpcTransport for HttpRpcClient {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        tracing::trace!(url = %self.url, method = %req.method, id = %req.id, "sending request");

        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| self.map_reqwest(e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Http(format!("HTTP {status}: {body}")));
        }

        let body = resp.bytes().await.map_err(|e| self.map_reqwest(e))?;
        parse_body(&body)
    }

    fn url(&self) -> &str {
        &self.url
    }
}
