//! Best-effort translation of revert payloads into readable reasons.
//!
//! Tried in order: `Error(string)`, `Panic(uint256)`, then the custom errors
//! declared in the contract ABI. Anything else decodes to `None` and the
//! caller keeps the raw error.

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_json_abi::JsonAbi;
use serde_json::Value;

use chaincall_core::InvokeError;

use crate::abi::dyn_to_json;
use crate::registry::{ErrorRegistry, ErrorSignature};
use crate::revert::{decode_error_string, decode_panic};

/// A successfully matched revert payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRevert {
    /// `Error`, `Panic`, or the custom error's name.
    pub name: String,
    /// The embedded message of an `Error(string)` revert.
    pub message: Option<String>,
    /// Decoded arguments, kept for diagnostics.
    pub args: Vec<(String, Value)>,
    pub data: Vec<u8>,
}

impl DecodedRevert {
    /// The human-readable reason: the message for `Error(string)`, otherwise
    /// the error's name.
    pub fn reason(&self) -> &str {
        self.message.as_deref().unwrap_or(&self.name)
    }
}

impl From<DecodedRevert> for InvokeError {
    fn from(d: DecodedRevert) -> Self {
        InvokeError::DecodedRevert {
            name: d.name,
            message: d.message,
            data: d.data,
        }
    }
}

/// Matches revert payloads against a contract's error signatures.
#[derive(Debug, Clone, Default)]
pub struct RevertDecoder {
    registry: ErrorRegistry,
}

impl RevertDecoder {
    /// A decoder that only knows `Error(string)` and `Panic(uint256)`.
    pub fn standard() -> Self {
        Self::default()
    }

    pub fn from_abi(abi: &JsonAbi) -> Self {
        Self {
            registry: ErrorRegistry::from_abi(abi),
        }
    }

    pub fn registry(&self) -> &ErrorRegistry {
        &self.registry
    }

    pub fn decode(&self, data: &[u8]) -> Option<DecodedRevert> {
        if let Some(message) = decode_error_string(data) {
            return Some(DecodedRevert {
                name: "Error".into(),
                message: Some(message),
                args: vec![],
                data: data.to_vec(),
            });
        }

        if let Some((code, meaning)) = decode_panic(data) {
            return Some(DecodedRevert {
                name: "Panic".into(),
                message: None,
                args: vec![
                    ("code".into(), Value::from(code)),
                    ("meaning".into(), Value::from(meaning)),
                ],
                data: data.to_vec(),
            });
        }

        let selector: [u8; 4] = data.get(..4)?.try_into().ok()?;
        let payload = &data[4..];
        self.registry
            .get_by_selector(selector)
            .iter()
            .find_map(|sig| decode_custom(sig, payload))
            .map(|(name, args)| DecodedRevert {
                name,
                message: None,
                args,
                data: data.to_vec(),
            })
    }

    /// Decode a `0x`-prefixed hex payload.
    pub fn decode_hex(&self, hex_data: &str) -> Option<DecodedRevert> {
        let bytes = hex::decode(hex_data.trim().trim_start_matches("0x")).ok()?;
        self.decode(&bytes)
    }
}

fn decode_custom(sig: &ErrorSignature, payload: &[u8]) -> Option<(String, Vec<(String, Value)>)> {
    if sig.inputs.is_empty() {
        return Some((sig.name.clone(), vec![]));
    }
    let types = sig.inputs.iter().map(|p| p.ty.clone()).collect();
    let values = match DynSolType::Tuple(types).abi_decode_params(payload).ok()? {
        DynSolValue::Tuple(vals) => vals,
        single => vec![single],
    };
    let args = sig
        .inputs
        .iter()
        .zip(&values)
        .map(|(p, v)| (p.name.clone(), dyn_to_json(v)))
        .collect();
    Some((sig.name.clone(), args))
}
