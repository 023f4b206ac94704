//! Error types: transport-level failures and the invocation taxonomy.

use std::fmt;

use thiserror::Error;

use crate::request::JsonRpcError;
use crate::ChainId;

/// Errors that can occur while talking to a single connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, DNS, non-2xx status, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON-RPC protocol-level error returned by the node (including reverts).
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// Request timed out after the connection's configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Returns `true` if the failure says nothing about the call itself, only
    /// that the connection could not carry it. Such failures evict the
    /// connection from the provider cache.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Timeout { .. })
    }

    /// Returns `true` if this is a node-side execution error.
    pub fn is_execution_error(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}

/// Why one endpoint candidate was skipped during connection acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointFailure {
    pub url: String,
    pub reason: String,
}

impl fmt::Display for EndpointFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.url, self.reason)
    }
}

/// Errors surfaced by contract reads and writes.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The endpoint pool has no candidates for this chain.
    #[error("no RPC endpoints configured for chain {chain_id}")]
    NoEndpointsConfigured { chain_id: ChainId },

    /// Every configured candidate failed to connect or answer the probe.
    #[error("all {} RPC endpoints failed for chain {chain_id}", .failures.len())]
    AllEndpointsFailed {
        chain_id: ChainId,
        failures: Vec<EndpointFailure>,
    },

    /// A write was attempted without a connected signer.
    #[error("wallet not connected")]
    NotConnected,

    /// The signer is connected to a different chain than the contract's.
    #[error("wrong network: expected chain {expected}, wallet is on {}", display_chain(.actual))]
    WrongNetwork {
        expected: ChainId,
        actual: Option<ChainId>,
    },

    /// The call failed and no structured reason could be decoded.
    #[error("invocation failed: {0}")]
    InvocationFailed(#[source] TransportError),

    /// The call reverted with a recognised error; displays the readable reason only.
    #[error("{}", reason_or_name(.name, .message))]
    DecodedRevert {
        name: String,
        message: Option<String>,
        data: Vec<u8>,
    },

    /// The call could not be encoded, or its reply could not be decoded.
    #[error("invalid call to '{method}': {reason}")]
    InvalidCall { method: String, reason: String },
}

impl InvokeError {
    /// Returns `true` if the signer's state rejected the call before any I/O.
    pub fn is_signer_error(&self) -> bool {
        matches!(self, Self::NotConnected | Self::WrongNetwork { .. })
    }

    /// The human-readable reason of a decoded revert, if this is one.
    pub fn revert_reason(&self) -> Option<&str> {
        match self {
            Self::DecodedRevert { name, message, .. } => Some(reason_or_name(name, message)),
            _ => None,
        }
    }
}

fn reason_or_name<'a>(name: &'a str, message: &'a Option<String>) -> &'a str {
    message.as_deref().unwrap_or(name)
}

fn display_chain(chain: &Option<ChainId>) -> String {
    chain.map_or_else(|| "none".to_string(), |c| c.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoded_revert_displays_message_only() {
        let err = InvokeError::DecodedRevert {
            name: "Error".into(),
            message: Some("Insufficient balance".into()),
            data: vec![],
        };
        assert_eq!(err.to_string(), "Insufficient balance");
        assert_eq!(err.revert_reason(), Some("Insufficient balance"));
    }

    #[test]
    fn decoded_revert_without_message_displays_name() {
        let err = InvokeError::DecodedRevert {
            name: "EnforcedPause".into(),
            message: None,
            data: vec![],
        };
        assert_eq!(err.to_string(), "EnforcedPause");
    }

    #[test]
    fn wrong_network_display() {
        let err = InvokeError::WrongNetwork { expected: 1, actual: Some(137) };
        assert_eq!(err.to_string(), "wrong network: expected chain 1, wallet is on 137");
        let err = InvokeError::WrongNetwork { expected: 1, actual: None };
        assert!(err.to_string().ends_with("none"));
        assert!(err.is_signer_error());
    }

    #[test]
    fn connection_vs_execution_errors() {
        assert!(TransportError::Http("refused".into()).is_connection_error());
        assert!(TransportError::Timeout { ms: 10 }.is_connection_error());
        let rpc = TransportError::Rpc(JsonRpcError::new(3, "execution reverted", None));
        assert!(!rpc.is_connection_error());
        assert!(rpc.is_execution_error());
    }
}
