//! Process-wide provider cache: one verified-live connection per chain.
//!
//! Acquisition order for a chain:
//! 1. Cached handle → probe it; on success reuse, on failure evict.
//! 2. Walk the endpoint pool front to back: connect + probe each candidate,
//!    cache and return the first that answers.
//! 3. Nothing answered → `AllEndpointsFailed` (or `NoEndpointsConfigured`).
//!
//! Each chain slot sits behind its own async mutex, held across
//! probe-then-use and probe-then-replace, so concurrent callers never observe
//! a half-updated slot. Different chains never contend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

use crate::endpoints::{EndpointPool, EndpointRecord};
use crate::error::{EndpointFailure, InvokeError, TransportError};
use crate::transport::RpcTransport;
use crate::ChainId;

/// Opens a connection to one endpoint. The cache probes whatever it returns.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(
        &self,
        endpoint: &EndpointRecord,
    ) -> Result<Arc<dyn RpcTransport>, TransportError>;
}

/// A cached, verified-live connection.
#[derive(Clone)]
pub struct ProviderHandle {
    pub chain_id: ChainId,
    pub url: String,
    pub transport: Arc<dyn RpcTransport>,
    /// When the last liveness probe succeeded.
    pub verified_at: Instant,
    /// Block number reported by the last probe.
    pub latest_block: u64,
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("chain_id", &self.chain_id)
            .field("url", &self.url)
            .field("latest_block", &self.latest_block)
            .finish()
    }
}

type Slot = Arc<AsyncMutex<Option<ProviderHandle>>>;

/// Slot-per-chain cache of live connections, shared by every contract client.
pub struct ProviderCache {
    pool: EndpointPool,
    connector: Arc<dyn Connector>,
    slots: Mutex<HashMap<ChainId, Slot>>,
}

impl ProviderCache {
    pub fn new(pool: EndpointPool, connector: Arc<dyn Connector>) -> Self {
        Self {
            pool,
            connector,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// The endpoint pool this cache draws from.
    pub fn pool(&self) -> &EndpointPool {
        &self.pool
    }

    /// Candidate endpoints for `chain_id` (introspection).
    pub fn get_endpoints(&self, chain_id: ChainId) -> Vec<EndpointRecord> {
        self.pool.get_endpoints(chain_id)
    }

    fn slot(&self, chain_id: ChainId) -> Slot {
        self.slots.lock().entry(chain_id).or_default().clone()
    }

    fn existing_slot(&self, chain_id: ChainId) -> Option<Slot> {
        self.slots.lock().get(&chain_id).cloned()
    }

    /// Return a live connection for `chain_id`, probing as needed.
    pub async fn get_connection(
        &self,
        chain_id: ChainId,
    ) -> Result<Arc<dyn RpcTransport>, InvokeError> {
        let endpoints = self.pool.get_endpoints(chain_id);
        if endpoints.is_empty() {
            return Err(InvokeError::NoEndpointsConfigured { chain_id });
        }

        let slot = self.slot(chain_id);
        let mut cached = slot.lock().await;

        if let Some(handle) = cached.as_mut() {
            match handle.transport.block_number().await {
                Ok(block) => {
                    handle.verified_at = Instant::now();
                    handle.latest_block = block;
                    return Ok(handle.transport.clone());
                }
                Err(e) => {
                    tracing::info!(chain_id, url = %handle.url, error = %e, "cached provider failed probe, evicting");
                    *cached = None;
                }
            }
        }

        let mut failures = Vec::new();
        for endpoint in &endpoints {
            match self.open(endpoint).await {
                Ok(handle) => {
                    tracing::debug!(
                        chain_id,
                        url = %handle.url,
                        block = handle.latest_block,
                        skipped = failures.len(),
                        "provider connected"
                    );
                    let transport = handle.transport.clone();
                    *cached = Some(handle);
                    return Ok(transport);
                }
                Err(e) => {
                    tracing::warn!(chain_id, url = %endpoint.url, error = %e, "endpoint probe failed");
                    failures.push(EndpointFailure {
                        url: endpoint.url.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(InvokeError::AllEndpointsFailed { chain_id, failures })
    }

    async fn open(&self, endpoint: &EndpointRecord) -> Result<ProviderHandle, TransportError> {
        let transport = self.connector.connect(endpoint).await?;
        let latest_block = transport.block_number().await?;
        Ok(ProviderHandle {
            chain_id: endpoint.chain_id,
            url: endpoint.url.clone(),
            transport,
            verified_at: Instant::now(),
            latest_block,
        })
    }

    /// Evict the cached handle for `chain_id` if it is still `transport`.
    ///
    /// Called after a failed use; a handle that was already replaced by a
    /// concurrent caller is left alone. Never waits: if another caller holds
    /// the slot it is already re-probing the handle, and eviction is skipped.
    pub fn evict_if_current(&self, chain_id: ChainId, transport: &Arc<dyn RpcTransport>) {
        let Some(slot) = self.existing_slot(chain_id) else {
            return;
        };
        let Ok(mut cached) = slot.try_lock() else {
            tracing::debug!(chain_id, url = transport.url(), "slot busy, skipping eviction");
            return;
        };
        let is_current = cached
            .as_ref()
            .is_some_and(|h| Arc::ptr_eq(&h.transport, transport));
        if is_current {
            tracing::info!(chain_id, url = transport.url(), "evicting provider after failed call");
            *cached = None;
        }
    }

    /// Evict every cached handle. The next request per chain re-probes from
    /// the first candidate.
    pub fn clear(&self) {
        let dropped = {
            let mut slots = self.slots.lock();
            std::mem::take(&mut *slots)
        };
        tracing::info!(chains = dropped.len(), "provider cache cleared");
    }

    /// URL of the cached handle for `chain_id`, if one is cached and idle.
    pub fn cached_url(&self, chain_id: ChainId) -> Option<String> {
        let slot = self.existing_slot(chain_id)?;
        let cached = slot.try_lock().ok()?;
        cached.as_ref().map(|h| h.url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{JsonRpcRequest, JsonRpcResponse};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct MockTransport {
        url: String,
        alive: Arc<AtomicBool>,
    }

    #[async_trait]
    impl RpcTransport for MockTransport {
        async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
            if self.alive.load(Ordering::SeqCst) {
                Ok(JsonRpcResponse::success(req.id, serde_json::json!("0x10")))
            } else {
                Err(TransportError::Http(format!("{} unreachable", self.url)))
            }
        }

        fn url(&self) -> &str {
            &self.url
        }
    }

    /// Records every connect attempt; endpoints are alive per `alive` flags.
    struct MockConnector {
        alive: HashMap<String, Arc<AtomicBool>>,
        attempts: Mutex<Vec<String>>,
    }

    impl MockConnector {
        fn new(endpoints: &[(&str, bool)]) -> Arc<Self> {
            Arc::new(Self {
                alive: endpoints
                    .iter()
                    .map(|(u, a)| (u.to_string(), Arc::new(AtomicBool::new(*a))))
                    .collect(),
                attempts: Mutex::new(Vec::new()),
            })
        }

        fn set_alive(&self, url: &str, alive: bool) {
            self.alive[url].store(alive, Ordering::SeqCst);
        }

        fn take_attempts(&self) -> Vec<String> {
            std::mem::take(&mut *self.attempts.lock())
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn connect(
            &self,
            endpoint: &EndpointRecord,
        ) -> Result<Arc<dyn RpcTransport>, TransportError> {
            self.attempts.lock().push(endpoint.url.clone());
            Ok(Arc::new(MockTransport {
                url: endpoint.url.clone(),
                alive: self.alive[&endpoint.url].clone(),
            }))
        }
    }

    fn cache(connector: Arc<MockConnector>) -> ProviderCache {
        let pool = EndpointPool::new().with_chain(1, ["a", "b", "c"]);
        ProviderCache::new(pool, connector)
    }

    #[tokio::test]
    async fn first_live_candidate_wins_in_order() {
        let conn = MockConnector::new(&[("a", false), ("b", true), ("c", true)]);
        let cache = cache(conn.clone());
        let t = cache.get_connection(1).await.unwrap();
        assert_eq!(t.url(), "b");
        assert_eq!(conn.take_attempts(), ["a", "b"]);
        assert_eq!(cache.cached_url(1).as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn cached_handle_is_reused_without_reprobing_failed_ones() {
        let conn = MockConnector::new(&[("a", false), ("b", true), ("c", true)]);
        let cache = cache(conn.clone());
        cache.get_connection(1).await.unwrap();
        conn.take_attempts();

        let t = cache.get_connection(1).await.unwrap();
        assert_eq!(t.url(), "b");
        assert!(conn.take_attempts().is_empty());
    }

    #[tokio::test]
    async fn failed_probe_restarts_from_first_candidate() {
        let conn = MockConnector::new(&[("a", false), ("b", true), ("c", true)]);
        let cache = cache(conn.clone());
        cache.get_connection(1).await.unwrap();
        conn.take_attempts();

        conn.set_alive("b", false);
        conn.set_alive("a", true);
        let t = cache.get_connection(1).await.unwrap();
        assert_eq!(t.url(), "a");
        assert_eq!(conn.take_attempts(), ["a"]);
    }

    #[tokio::test]
    async fn all_failed_reports_each_candidate() {
        let conn = MockConnector::new(&[("a", false), ("b", false), ("c", false)]);
        let cache = cache(conn.clone());
        match cache.get_connection(1).await {
            Err(InvokeError::AllEndpointsFailed { chain_id, failures }) => {
                assert_eq!(chain_id, 1);
                let urls: Vec<_> = failures.iter().map(|f| f.url.as_str()).collect();
                assert_eq!(urls, ["a", "b", "c"]);
            }
            Err(other) => panic!("expected AllEndpointsFailed, got {other:?}"),
            Ok(t) => panic!("unexpected connection to {}", t.url()),
        }
        assert!(cache.cached_url(1).is_none());
    }

    #[tokio::test]
    async fn unconfigured_chain_fails_fast() {
        let conn = MockConnector::new(&[("a", true), ("b", true), ("c", true)]);
        let cache = cache(conn.clone());
        assert!(cache.get_endpoints(5).is_empty());
        assert!(matches!(
            cache.get_connection(5).await,
            Err(InvokeError::NoEndpointsConfigured { chain_id: 5 })
        ));
        assert!(conn.take_attempts().is_empty());
        assert!(cache.slots.lock().is_empty());
    }

    #[tokio::test]
    async fn clear_forces_reprobe_from_first() {
        let conn = MockConnector::new(&[("a", false), ("b", true), ("c", true)]);
        let cache = cache(conn.clone());
        cache.get_connection(1).await.unwrap();
        conn.set_alive("a", true);
        conn.take_attempts();

        cache.clear();
        assert!(cache.cached_url(1).is_none());
        let t = cache.get_connection(1).await.unwrap();
        assert_eq!(t.url(), "a");
        assert_eq!(conn.take_attempts(), ["a"]);
    }

    #[tokio::test]
    async fn evict_ignores_replaced_handle() {
        let conn = MockConnector::new(&[("a", true), ("b", true), ("c", true)]);
        let cache = cache(conn.clone());
        let current = cache.get_connection(1).await.unwrap();
        let stranger: Arc<dyn RpcTransport> = Arc::new(MockTransport {
            url: "x".into(),
            alive: Arc::new(AtomicBool::new(true)),
        });

        cache.evict_if_current(1, &stranger);
        assert_eq!(cache.cached_url(1).as_deref(), Some("a"));

        cache.evict_if_current(1, &current);
        assert!(cache.cached_url(1).is_none());
    }

    #[tokio::test]
    async fn evict_skips_busy_slot() {
        let conn = MockConnector::new(&[("a", true), ("b", true), ("c", true)]);
        let cache = cache(conn.clone());
        let current = cache.get_connection(1).await.unwrap();

        let slot = cache.slot(1);
        let held = slot.lock().await;
        cache.evict_if_current(1, &current);
        drop(held);
        assert_eq!(cache.cached_url(1).as_deref(), Some("a"));
    }

    #[test]
    fn evict_on_unknown_chain_creates_no_slot() {
        let conn = MockConnector::new(&[("a", true), ("b", true), ("c", true)]);
        let cache = cache(conn);
        let stranger: Arc<dyn RpcTransport> = Arc::new(MockTransport {
            url: "x".into(),
            alive: Arc::new(AtomicBool::new(true)),
        });
        cache.evict_if_current(9, &stranger);
        assert!(cache.slots.lock().is_empty());
    }
}
