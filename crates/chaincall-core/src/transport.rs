//! The `RpcTransport` trait, implemented by every connection handle.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};

/// An async JSON-RPC connection: a public HTTP endpoint, or a wallet's channel.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` for use across Tokio tasks.
///
/// # Object Safety
/// The trait is object-safe and is passed around as `Arc<dyn RpcTransport>`.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    /// Send a single JSON-RPC request and return the response.
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// Return the transport's identifier (URL or name).
    fn url(&self) -> &str;

    /// Convenience: call a method and return the raw `result` value.
    ///
    /// A node-side error object becomes [`TransportError::Rpc`].
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        let req = JsonRpcRequest::new(method, params);
        let resp = self.send(req).await?;
        resp.into_result().map_err(TransportError::Rpc)
    }

    /// Fetch the latest block number. Used as the liveness probe.
    async fn block_number(&self) -> Result<u64, TransportError> {
        let value = self.request("eth_blockNumber", vec![]).await?;
        let hex = value
            .as_str()
            .ok_or_else(|| TransportError::Other(format!("unexpected block number: {value}")))?;
        u64::from_str_radix(hex.trim_start_matches("0x"), 16)
            .map_err(|e| TransportError::Other(format!("invalid block number {hex}: {e}")))
    }
}
