//! Static per-chain endpoint pool and its configuration.
//!
//! The order of URLs for a chain is the fallback preference: the provider
//! cache always probes candidates front to back.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ChainId;

/// A candidate RPC endpoint for one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub chain_id: ChainId,
    pub url: String,
    /// Position in the chain's fallback list (0 = tried first).
    pub priority: usize,
}

/// Endpoint configuration as loaded at startup.
///
/// ```json
/// {
///   "chains": { "1": ["https://eth.llamarpc.com", "https://rpc.ankr.com/eth"] },
///   "request_timeout_ms": 10000
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// chain id → ordered RPC URLs
    #[serde(default)]
    pub chains: HashMap<ChainId, Vec<String>>,
    /// Per-request timeout applied by the HTTP transport.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Fill chains missing from `chains` with the built-in public endpoints.
    #[serde(default)]
    pub include_public_defaults: bool,
}

fn default_request_timeout_ms() -> u64 { 30_000 }

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            chains: HashMap::new(),
            request_timeout_ms: default_request_timeout_ms(),
            include_public_defaults: false,
        }
    }
}

impl EndpointConfig {
    /// Parse a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw).map_err(std::io::Error::other)
    }
}

/// Ordered fallback endpoints per chain. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct EndpointPool {
    chains: BTreeMap<ChainId, Vec<String>>,
}

impl EndpointPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the ordered candidate list for one chain.
    pub fn with_chain<I, S>(mut self, chain_id: ChainId, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chains
            .insert(chain_id, urls.into_iter().map(Into::into).collect());
        self
    }

    /// Build a pool from configuration.
    pub fn from_config(config: &EndpointConfig) -> Self {
        let mut pool = if config.include_public_defaults {
            Self::public_defaults()
        } else {
            Self::new()
        };
        for (chain_id, urls) in &config.chains {
            pool.chains.insert(*chain_id, urls.clone());
        }
        pool
    }

    /// Free, no-API-key public endpoints for common chains.
    ///
    /// Reliability varies; suitable as a last-resort fallback.
    pub fn public_defaults() -> Self {
        Self::new()
            .with_chain(1, [
                "https://eth.llamarpc.com",
                "https://rpc.ankr.com/eth",
                "https://cloudflare-eth.com",
            ])
            .with_chain(10, ["https://rpc.ankr.com/optimism"])
            .with_chain(56, ["https://rpc.ankr.com/bsc"])
            .with_chain(137, ["https://polygon.llamarpc.com", "https://rpc.ankr.com/polygon"])
            .with_chain(8453, ["https://rpc.ankr.com/base"])
            .with_chain(42161, ["https://rpc.ankr.com/arbitrum"])
            .with_chain(11155111, ["https://rpc.sepolia.org"])
    }

    /// Candidate endpoints for `chain_id` in fallback order.
    ///
    /// An unconfigured chain yields an empty list, not an error.
    pub fn get_endpoints(&self, chain_id: ChainId) -> Vec<EndpointRecord> {
        self.chains
            .get(&chain_id)
            .map(|urls| {
                urls.iter()
                    .enumerate()
                    .map(|(priority, url)| EndpointRecord {
                        chain_id,
                        url: url.clone(),
                        priority,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Configured chain ids, ascending.
    pub fn chains(&self) -> Vec<ChainId> {
        self.chains.keys().copied().collect()
    }
}
