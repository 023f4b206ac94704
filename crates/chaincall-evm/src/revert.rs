//! Standard Solidity revert payloads: `Error(string)` and `Panic(uint256)`.
//!
//! `require(cond, "message")` reverts with `0x08c379a0 ++ abi(string)`.
//! Checked arithmetic, failed `assert`s and bad array indexing revert with
//! `0x4e487b71 ++ abi(uint256)`.

use alloy_core::dyn_abi::{DynSolType, DynSolValue};

/// `keccak256("Error(string)")[..4]`
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// `keccak256("Panic(uint256)")[..4]`
pub const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

/// Decode an `Error(string)` payload into its message.
pub fn decode_error_string(data: &[u8]) -> Option<String> {
    let payload = data.strip_prefix(&ERROR_STRING_SELECTOR)?;
    match DynSolType::String.abi_decode(payload) {
        Ok(DynSolValue::String(s)) => Some(s),
        _ => None,
    }
}

/// Decode a `Panic(uint256)` payload into `(code, meaning)`.
pub fn decode_panic(data: &[u8]) -> Option<(u64, &'static str)> {
    let payload = data.strip_prefix(&PANIC_SELECTOR)?;
    match DynSolType::Uint(256).abi_decode(payload) {
        Ok(DynSolValue::Uint(v, _)) if v <= alloy_primitives::U256::from(u64::MAX) => {
            let code = v.to::<u64>();
            Some((code, panic_meaning(code)))
        }
        _ => None,
    }
}

pub fn panic_meaning(code: u64) -> &'static str {
    match code {
        0x00 => "generic compiler-inserted panic",
        0x01 => "assert() called with false condition",
        0x11 => "arithmetic overflow or underflow",
        0x12 => "division or modulo by zero",
        0x21 => "invalid enum value",
        0x22 => "corrupted storage byte array",
        0x31 => ".pop() on empty array",
        0x32 => "out-of-bounds array access",
        0x41 => "too much memory allocated",
        0x51 => "called zero-initialized internal function pointer",
        _ => "unknown panic code",
    }
}
