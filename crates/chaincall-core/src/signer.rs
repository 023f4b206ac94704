//! Read-only view of the externally-owned signer (wallet).
//!
//! The wallet connection itself lives outside this crate. ChainCall only
//! polls a snapshot of it at call time and never stores the channel.

use std::sync::Arc;

use crate::transport::RpcTransport;
use crate::ChainId;

/// Point-in-time state of the signer.
#[derive(Clone, Default)]
pub struct SignerSnapshot {
    pub is_connected: bool,
    /// Chain the wallet is currently switched to.
    pub active_chain: Option<ChainId>,
    /// Account address (`0x…`) that will sign writes.
    pub address: Option<String>,
    /// The wallet's own RPC channel. Signs `eth_sendTransaction` requests.
    pub channel: Option<Arc<dyn RpcTransport>>,
}

impl SignerSnapshot {
    /// A snapshot of no wallet at all.
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// A connected wallet on `chain_id`.
    pub fn connected(
        chain_id: ChainId,
        address: impl Into<String>,
        channel: Arc<dyn RpcTransport>,
    ) -> Self {
        Self {
            is_connected: true,
            active_chain: Some(chain_id),
            address: Some(address.into()),
            channel: Some(channel),
        }
    }

    /// The signer's channel if it is connected on `chain_id`.
    pub fn channel_for(&self, chain_id: ChainId) -> Option<&Arc<dyn RpcTransport>> {
        if self.is_connected && self.active_chain == Some(chain_id) {
            self.channel.as_ref()
        } else {
            None
        }
    }
}

impl std::fmt::Debug for SignerSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerSnapshot")
            .field("is_connected", &self.is_connected)
            .field("active_chain", &self.active_chain)
            .field("address", &self.address)
            .field("channel", &self.channel.as_ref().map(|c| c.url().to_string()))
            .finish()
    }
}

/// Source of signer snapshots, polled on every call.
pub trait SignerSource: Send + Sync {
    fn snapshot(&self) -> SignerSnapshot;
}

impl SignerSource for SignerSnapshot {
    fn snapshot(&self) -> SignerSnapshot {
        self.clone()
    }
}
