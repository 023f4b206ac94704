//! Reads and writes against one deployed contract.
//!
//! Reads go through the connection resolver and the read sequencer, so the
//! observed value always belongs to the most recently issued read. Writes are
//! simulated with `eth_call` before `eth_sendTransaction` and reverts are
//! decoded against the contract's ABI when possible.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use alloy_json_abi::{Function, JsonAbi};
use alloy_primitives::Address;
use serde_json::{json, Value};
use tokio::sync::watch;

use chaincall_core::{
    ChainId, ConnectionResolver, ConnectionSource, EndpointRecord, InvokeError, ProviderCache,
    ReadConnection, ReadState, RequestSequencer, SignerSource, TransportError, WriteConnection,
};

use crate::abi;
use crate::decoder::RevertDecoder;
use crate::payload::revert_data;

/// Address, ABI and chain of a deployed contract.
#[derive(Debug, Clone)]
pub struct ContractDescriptor {
    pub address: Address,
    pub abi: Arc<JsonAbi>,
    pub chain_id: ChainId,
}

impl ContractDescriptor {
    pub fn new(address: Address, abi: JsonAbi, chain_id: ChainId) -> Self {
        Self {
            address,
            abi: Arc::new(abi),
            chain_id,
        }
    }

    /// Parse the ABI from its standard JSON form.
    pub fn from_abi_json(
        address: Address,
        abi_json: &str,
        chain_id: ChainId,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(address, serde_json::from_str(abi_json)?, chain_id))
    }
}

/// A transaction the signer accepted. Confirmation is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmission {
    pub tx_hash: String,
    pub chain_id: ChainId,
    pub from: String,
    pub to: Address,
    pub method: String,
}

/// Holds the submitting count raised for the lifetime of one `write`.
struct Submitting<'a>(&'a AtomicUsize);

impl<'a> Submitting<'a> {
    fn enter(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for Submitting<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Client for one contract on one chain.
pub struct ContractClient {
    descriptor: ContractDescriptor,
    resolver: ConnectionResolver,
    decoder: RevertDecoder,
    reads: RequestSequencer<Value>,
    submitting: AtomicUsize,
}

impl ContractClient {
    pub fn new(
        descriptor: ContractDescriptor,
        cache: Arc<ProviderCache>,
        signer: Option<Arc<dyn SignerSource>>,
    ) -> Self {
        let decoder = RevertDecoder::from_abi(&descriptor.abi);
        Self {
            descriptor,
            resolver: ConnectionResolver::new(cache, signer),
            decoder,
            reads: RequestSequencer::new(),
            submitting: AtomicUsize::new(0),
        }
    }

    pub fn descriptor(&self) -> &ContractDescriptor {
        &self.descriptor
    }

    pub fn chain_id(&self) -> ChainId {
        self.descriptor.chain_id
    }

    /// Call a view method and return its shaped reply.
    ///
    /// The read is issued when this is called, not when the returned future
    /// is first polled. Every caller gets its own result. The observed value
    /// and the loading flag only follow the most recently issued read, and
    /// dropping that read before it finishes clears the loading flag.
    pub fn read<'a>(
        &'a self,
        method: &'a str,
        args: &'a [Value],
    ) -> impl Future<Output = Result<Value, InvokeError>> + Send + 'a {
        self.reads.run(self.read_once(method, args))
    }

    async fn read_once(&self, method: &str, args: &[Value]) -> Result<Value, InvokeError> {
        let func = self.function(method, args.len())?;
        let calldata = abi::encode_call(func, args).map_err(|reason| invalid(method, reason))?;
        let conn = self.read_connection().await?;

        let call = json!({
            "to": self.descriptor.address.to_string(),
            "data": format!("0x{}", hex::encode(&calldata)),
        });
        let raw = match conn.transport.request("eth_call", vec![call, json!("latest")]).await {
            Ok(raw) => raw,
            Err(e) => {
                if conn.source == ConnectionSource::Fallback && e.is_connection_error() {
                    self.resolver
                        .cache()
                        .evict_if_current(conn.chain_id, &conn.transport);
                }
                return Err(InvokeError::InvocationFailed(e));
            }
        };

        let bytes = reply_bytes(&raw).map_err(|reason| invalid(method, reason))?;
        abi::decode_reply(func, &bytes).map_err(|reason| invalid(method, reason))
    }

    /// Simulate, then submit, a state-changing call through the signer.
    pub async fn write(&self, method: &str, args: &[Value]) -> Result<PendingSubmission, InvokeError> {
        let _submitting = Submitting::enter(&self.submitting);

        let conn = self.write_connection()?;
        let func = self.function(method, args.len())?;
        let calldata = abi::encode_call(func, args).map_err(|reason| invalid(method, reason))?;

        let tx = json!({
            "from": conn.from,
            "to": self.descriptor.address.to_string(),
            "data": format!("0x{}", hex::encode(&calldata)),
        });

        if let Err(e) = conn
            .transport
            .request("eth_call", vec![tx.clone(), json!("latest")])
            .await
        {
            let err = self.explain(e);
            tracing::warn!(chain_id = conn.chain_id, method, error = %err, "preflight simulation rejected write");
            return Err(err);
        }

        let hash = conn
            .transport
            .request("eth_sendTransaction", vec![tx])
            .await
            .map_err(|e| self.explain(e))?;
        let tx_hash = hash
            .as_str()
            .ok_or_else(|| invalid(method, format!("unexpected transaction hash {hash}")))?
            .to_string();

        tracing::info!(chain_id = conn.chain_id, method, tx_hash = %tx_hash, "transaction submitted");
        Ok(PendingSubmission {
            tx_hash,
            chain_id: conn.chain_id,
            from: conn.from,
            to: self.descriptor.address,
            method: method.to_string(),
        })
    }

    /// The connection the next read would use.
    pub async fn read_connection(&self) -> Result<ReadConnection, InvokeError> {
        self.resolver.resolve_read(self.descriptor.chain_id).await
    }

    /// The signer connection the next write would use.
    pub fn write_connection(&self) -> Result<WriteConnection, InvokeError> {
        self.resolver.resolve_write(self.descriptor.chain_id)
    }

    /// Configured fallback endpoints for this contract's chain.
    pub fn endpoints(&self) -> Vec<EndpointRecord> {
        self.resolver.cache().get_endpoints(self.descriptor.chain_id)
    }

    /// Drop every cached provider, for all chains.
    pub fn clear_provider_cache(&self) {
        self.resolver.cache().clear();
    }

    pub fn is_loading(&self) -> bool {
        self.reads.is_loading()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst) > 0
    }

    /// Value of the most recently issued read that succeeded.
    pub fn observed(&self) -> Option<Value> {
        self.reads.observed()
    }

    pub fn subscribe(&self) -> watch::Receiver<ReadState<Value>> {
        self.reads.subscribe()
    }

    fn function(&self, method: &str, argc: usize) -> Result<&Function, InvokeError> {
        abi::find_function(&self.descriptor.abi, method, argc).map_err(|reason| invalid(method, reason))
    }

    /// Decode the revert carried by `err` if there is one, else keep it raw.
    fn explain(&self, err: TransportError) -> InvokeError {
        if !err.is_execution_error() {
            return InvokeError::InvocationFailed(err);
        }
        match revert_data(&err).and_then(|data| self.decoder.decode(&data)) {
            Some(decoded) => decoded.into(),
            None => InvokeError::InvocationFailed(err),
        }
    }
}

fn invalid(method: &str, reason: String) -> InvokeError {
    InvokeError::InvalidCall {
        method: method.to_string(),
        reason,
    }
}

fn reply_bytes(raw: &Value) -> Result<Vec<u8>, String> {
    let s = raw
        .as_str()
        .ok_or_else(|| format!("unexpected eth_call result {raw}"))?;
    hex::decode(s.trim_start_matches("0x")).map_err(|e| format!("invalid eth_call result: {e}"))
}
