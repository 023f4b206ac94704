//! Per-call connection selection.
//!
//! Reads prefer the signer's channel when it is connected on the right chain
//! (a user sees their own writes immediately) and otherwise go through the
//! provider cache. Writes always go through the signer and fail fast, before
//! any I/O, when it is missing or on another chain.

use std::sync::Arc;

use crate::cache::ProviderCache;
use crate::error::InvokeError;
use crate::signer::SignerSource;
use crate::transport::RpcTransport;
use crate::ChainId;

/// Where a read connection came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionSource {
    /// The connected wallet's own channel.
    Signer,
    /// A public endpoint from the provider cache.
    Fallback,
}

/// A connection usable for non-mutating calls.
#[derive(Clone)]
pub struct ReadConnection {
    pub chain_id: ChainId,
    pub source: ConnectionSource,
    pub transport: Arc<dyn RpcTransport>,
}

/// A signer-backed connection usable for transactions.
#[derive(Clone)]
pub struct WriteConnection {
    pub chain_id: ChainId,
    /// Account that signs, used as `from`.
    pub from: String,
    pub transport: Arc<dyn RpcTransport>,
}

impl std::fmt::Debug for ReadConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadConnection")
            .field("chain_id", &self.chain_id)
            .field("source", &self.source)
            .field("url", &self.transport.url())
            .finish()
    }
}

impl std::fmt::Debug for WriteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteConnection")
            .field("chain_id", &self.chain_id)
            .field("from", &self.from)
            .field("url", &self.transport.url())
            .finish()
    }
}

/// Chooses between the signer's channel and the shared provider cache.
#[derive(Clone)]
pub struct ConnectionResolver {
    cache: Arc<ProviderCache>,
    signer: Option<Arc<dyn SignerSource>>,
}

impl ConnectionResolver {
    pub fn new(cache: Arc<ProviderCache>, signer: Option<Arc<dyn SignerSource>>) -> Self {
        Self { cache, signer }
    }

    pub fn cache(&self) -> &Arc<ProviderCache> {
        &self.cache
    }

    /// Resolve a connection for reads on `chain_id`.
    pub async fn resolve_read(&self, chain_id: ChainId) -> Result<ReadConnection, InvokeError> {
        if let Some(signer) = &self.signer {
            let snapshot = signer.snapshot();
            if let Some(channel) = snapshot.channel_for(chain_id) {
                return Ok(ReadConnection {
                    chain_id,
                    source: ConnectionSource::Signer,
                    transport: channel.clone(),
                });
            }
        }

        let transport = self.cache.get_connection(chain_id).await?;
        Ok(ReadConnection {
            chain_id,
            source: ConnectionSource::Fallback,
            transport,
        })
    }

    /// Resolve the signer's connection for writes on `chain_id`.
    ///
    /// Never touches the network and never falls back to the cache.
    pub fn resolve_write(&self, chain_id: ChainId) -> Result<WriteConnection, InvokeError> {
        let snapshot = self
            .signer
            .as_ref()
            .map(|s| s.snapshot())
            .unwrap_or_default();

        if !snapshot.is_connected {
            return Err(InvokeError::NotConnected);
        }
        if snapshot.active_chain != Some(chain_id) {
            return Err(InvokeError::WrongNetwork {
                expected: chain_id,
                actual: snapshot.active_chain,
            });
        }
        match (snapshot.address, snapshot.channel) {
            (Some(from), Some(transport)) => Ok(WriteConnection {
                chain_id,
                from,
                transport,
            }),
            _ => Err(InvokeError::NotConnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Connector;
    use crate::endpoints::{EndpointPool, EndpointRecord};
    use crate::error::TransportError;
    use crate::request::{JsonRpcRequest, JsonRpcResponse};
    use crate::signer::SignerSnapshot;
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl RpcTransport for Named {
        async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
            Ok(JsonRpcResponse::success(req.id, serde_json::json!("0x1")))
        }

        fn url(&self) -> &str {
            self.0
        }
    }

    struct NamedConnector;

    #[async_trait]
    impl Connector for NamedConnector {
        async fn connect(
            &self,
            _endpoint: &EndpointRecord,
        ) -> Result<Arc<dyn RpcTransport>, TransportError> {
            Ok(Arc::new(Named("public")))
        }
    }

    fn resolver(signer: Option<SignerSnapshot>) -> ConnectionResolver {
        let pool = EndpointPool::new().with_chain(1, ["public"]);
        let cache = Arc::new(ProviderCache::new(pool, Arc::new(NamedConnector)));
        ConnectionResolver::new(cache, signer.map(|s| Arc::new(s) as Arc<dyn SignerSource>))
    }

    fn wallet(chain_id: ChainId) -> SignerSnapshot {
        SignerSnapshot::connected(chain_id, "0x00000000000000000000000000000000000000aa", Arc::new(Named("wallet")))
    }

    #[tokio::test]
    async fn read_prefers_signer_on_matching_chain() {
        let conn = resolver(Some(wallet(1))).resolve_read(1).await.unwrap();
        assert_eq!(conn.source, ConnectionSource::Signer);
        assert_eq!(conn.transport.url(), "wallet");
    }

    #[tokio::test]
    async fn read_falls_back_when_signer_on_other_chain() {
        let conn = resolver(Some(wallet(137))).resolve_read(1).await.unwrap();
        assert_eq!(conn.source, ConnectionSource::Fallback);
        assert_eq!(conn.transport.url(), "public");
    }

    #[tokio::test]
    async fn read_falls_back_without_channel() {
        let mut snapshot = wallet(1);
        snapshot.channel = None;
        let conn = resolver(Some(snapshot)).resolve_read(1).await.unwrap();
        assert_eq!(conn.source, ConnectionSource::Fallback);
    }

    #[test]
    fn write_requires_connected_signer() {
        assert!(matches!(resolver(None).resolve_write(1), Err(InvokeError::NotConnected)));
        assert!(matches!(
            resolver(Some(SignerSnapshot::disconnected())).resolve_write(1),
            Err(InvokeError::NotConnected)
        ));
    }

    #[test]
    fn write_rejects_wrong_network() {
        match resolver(Some(wallet(137))).resolve_write(1) {
            Err(InvokeError::WrongNetwork { expected, actual }) => {
                assert_eq!(expected, 1);
                assert_eq!(actual, Some(137));
            }
            other => panic!("expected WrongNetwork, got {other:?}"),
        }
    }

    #[test]
    fn write_uses_signer_channel() {
        let conn = resolver(Some(wallet(1))).resolve_write(1).unwrap();
        assert_eq!(conn.transport.url(), "wallet");
        assert!(conn.from.ends_with("aa"));
    }
}
