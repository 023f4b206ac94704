//! Custom error signatures, indexed by 4-byte selector.
//!
//! Built from the contract's ABI: every `error Name(...)` declaration becomes
//! one [`ErrorSignature`] with its parameter types already resolved.

use std::collections::HashMap;

use alloy_core::dyn_abi::DynSolType;
use alloy_dyn_abi::Specifier;
use alloy_json_abi::JsonAbi;

/// One input parameter of a custom error.
#[derive(Debug, Clone)]
pub struct ErrorParam {
    pub name: String,
    pub ty: DynSolType,
}

/// A custom error declared in a contract ABI.
#[derive(Debug, Clone)]
pub struct ErrorSignature {
    /// Error name, e.g. `InsufficientFunds`.
    pub name: String,
    /// Canonical signature, e.g. `InsufficientFunds(uint256,uint256)`.
    pub signature: String,
    /// `keccak256(signature)[..4]`
    pub selector: [u8; 4],
    pub inputs: Vec<ErrorParam>,
}

/// Selector-indexed lookup of custom errors.
///
/// Selector collisions are kept: every signature registered under a selector
/// is tried in registration order.
#[derive(Debug, Clone, Default)]
pub struct ErrorRegistry {
    by_selector: HashMap<[u8; 4], Vec<ErrorSignature>>,
}

impl ErrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every custom error the ABI declares.
    ///
    /// Errors whose parameter types cannot be resolved are skipped.
    pub fn from_abi(abi: &JsonAbi) -> Self {
        let mut registry = Self::new();
        for error in abi.errors() {
            let inputs = error
                .inputs
                .iter()
                .map(|p| {
                    p.resolve().map(|ty| ErrorParam {
                        name: p.name.clone(),
                        ty,
                    })
                })
                .collect::<Result<Vec<_>, _>>();
            match inputs {
                Ok(inputs) => registry.register(ErrorSignature {
                    name: error.name.clone(),
                    signature: error.signature(),
                    selector: error.selector().0,
                    inputs,
                }),
                Err(e) => {
                    tracing::warn!(error = %error.name, reason = %e, "skipping unresolvable custom error");
                }
            }
        }
        registry
    }

    pub fn register(&mut self, sig: ErrorSignature) {
        self.by_selector.entry(sig.selector).or_default().push(sig);
    }

    pub fn get_by_selector(&self, selector: [u8; 4]) -> &[ErrorSignature] {
        self.by_selector
            .get(&selector)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of registered signatures.
    pub fn len(&self) -> usize {
        self.by_selector.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_selector.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABI: &str = r#"[
        {"type":"error","name":"InsufficientFunds","inputs":[
            {"name":"available","type":"uint256"},
            {"name":"required","type":"uint256"}
        ]},
        {"type":"error","name":"Paused","inputs":[]},
        {"type":"function","name":"pause","inputs":[],"outputs":[],"stateMutability":"nonpayable"}
    ]"#;

    #[test]
    fn registers_abi_errors_by_selector() {
        let abi: JsonAbi = serde_json::from_str(ABI).unwrap();
        let reg = ErrorRegistry::from_abi(&abi);
        assert_eq!(reg.len(), 2);

        let paused = abi.errors().find(|e| e.name == "Paused").unwrap();
        let found = reg.get_by_selector(paused.selector().0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].signature, "Paused()");
        assert!(found[0].inputs.is_empty());
    }

    #[test]
    fn resolves_parameter_types() {
        let abi: JsonAbi = serde_json::from_str(ABI).unwrap();
        let reg = ErrorRegistry::from_abi(&abi);
        let sig = abi.errors().find(|e| e.name == "InsufficientFunds").unwrap();
        let entry = &reg.get_by_selector(sig.selector().0)[0];
        assert_eq!(entry.inputs[0].name, "available");
        assert_eq!(entry.inputs[1].ty, DynSolType::Uint(256));
    }

    #[test]
    fn unknown_selector_is_empty() {
        let reg = ErrorRegistry::new();
        assert!(reg.is_empty());
        assert!(reg.get_by_selector([0xde, 0xad, 0xbe, 0xef]).is_empty());
    }
}
