//! chaincall-http — HTTP JSON-RPC transport for ChainCall.
//!
//! [`HttpRpcClient`] is a plain `reqwest` connection with a request timeout;
//! fallback across endpoints is the provider cache's job, not the client's.
//! [`HttpConnector`] is the [`chaincall_core::Connector`] that opens one per
//! endpoint.

pub mod client;
pub mod connector;

pub use client::{HttpClientConfig, HttpRpcClient};
pub use connector::HttpConnector;
