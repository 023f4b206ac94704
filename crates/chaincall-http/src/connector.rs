//! The connector the provider cache uses to open HTTP endpoints.

use std::sync::Arc;

use async_trait::async_trait;

use chaincall_core::cache::Connector;
use chaincall_core::endpoints::{EndpointConfig, EndpointRecord};
use chaincall_core::error::TransportError;
use chaincall_core::transport::RpcTransport;

use crate::client::{HttpClientConfig, HttpRpcClient};

/// Opens an [`HttpRpcClient`] per endpoint, sharing one connection pool.
pub struct HttpConnector {
    http: reqwest::Client,
    config: HttpClientConfig,
}

impl HttpConnector {
    pub fn new(config: HttpClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    /// Build from the endpoint configuration's timeout.
    pub fn from_endpoint_config(config: &EndpointConfig) -> Result<Self, TransportError> {
        Self::new(HttpClientConfig {
            request_timeout: std::time::Duration::from_millis(config.request_timeout_ms),
        })
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(
        &self,
        endpoint: &EndpointRecord,
    ) -> Result<Arc<dyn RpcTransport>, TransportError> {
        if !(endpoint.url.starts_with("http://") || endpoint.url.starts_with("https://")) {
            return Err(TransportError::Other(format!(
                "unsupported endpoint scheme: {}",
                endpoint.url
            )));
        }
        Ok(Arc::new(HttpRpcClient::with_client(
            endpoint.url.clone(),
            self.http.clone(),
            self.config.request_timeout,
        )))
    }
}
