//! chaincall-core — connection plumbing for the ChainCall contract client.
//!
//! # Overview
//!
//! ChainCall invokes smart-contract methods through whichever connection is
//! usable right now: the user's wallet channel when it is on the right chain,
//! otherwise a pool of public fallback endpoints. The core crate defines:
//!
//! - [`RpcTransport`]: the async trait every connection implements
//! - [`JsonRpcRequest`] / [`JsonRpcResponse`]: wire types
//! - [`TransportError`] / [`InvokeError`]: structured error types
//! - [`EndpointPool`]: static, ordered fallback endpoints per chain
//! - [`ProviderCache`]: process-wide, one verified-live connection per chain
//! - [`ConnectionResolver`]: signer-vs-fallback selection for reads and writes
//! - [`RequestSequencer`]: last-issued-wins bookkeeping for concurrent reads

pub mod cache;
pub mod endpoints;
pub mod error;
pub mod request;
pub mod resolver;
pub mod sequencer;
pub mod signer;
pub mod transport;

pub use cache::{Connector, ProviderCache, ProviderHandle};
pub use endpoints::{EndpointConfig, EndpointPool, EndpointRecord};
pub use error::{EndpointFailure, InvokeError, TransportError};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
pub use resolver::{ConnectionResolver, ConnectionSource, ReadConnection, WriteConnection};
pub use sequencer::{Completion, FetchToken, InFlight, ReadState, RequestSequencer};
pub use signer::{SignerSnapshot, SignerSource};
pub use transport::RpcTransport;

/// Numeric EVM chain identifier (EIP-155).
pub type ChainId = u64;
