//! ABI call encoding and reply shaping.
//!
//! Arguments arrive as JSON values and are coerced to the method's declared
//! Solidity types; replies leave as JSON values.

use std::str::FromStr;

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_dyn_abi::{FunctionExt, JsonAbiExt, Specifier};
use alloy_json_abi::{Function, JsonAbi};
use alloy_primitives::{Address, B256, I256, U256};
use serde_json::{Map, Value};

/// Look up a function by name or full signature.
///
/// `transfer(address,uint256)` selects an exact overload. A bare name picks
/// the overload whose arity matches `argc`, falling back to the first one.
pub fn find_function<'a>(abi: &'a JsonAbi, method: &str, argc: usize) -> Result<&'a Function, String> {
    if let Some(open) = method.find('(') {
        let name = &method[..open];
        return abi
            .function(name)
            .and_then(|overloads| overloads.iter().find(|f| f.signature() == method))
            .ok_or_else(|| format!("no function with signature {method}"));
    }
    let overloads = abi
        .function(method)
        .filter(|o| !o.is_empty())
        .ok_or_else(|| format!("no function named {method}"))?;
    Ok(overloads
        .iter()
        .find(|f| f.inputs.len() == argc)
        .unwrap_or(&overloads[0]))
}

/// Encode `selector ++ abi(args)` for a call to `func`.
pub fn encode_call(func: &Function, args: &[Value]) -> Result<Vec<u8>, String> {
    if args.len() != func.inputs.len() {
        return Err(format!(
            "expected {} argument(s), got {}",
            func.inputs.len(),
            args.len()
        ));
    }
    let values = func
        .inputs
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty = param.resolve().map_err(|e| e.to_string())?;
            json_to_dyn(arg, &ty).map_err(|e| format!("argument '{}': {e}", param.name))
        })
        .collect::<Result<Vec<_>, _>>()?;
    func.abi_encode_input(&values).map_err(|e| e.to_string())
}

/// Decode `data` as `func`'s return values and shape them into JSON.
pub fn decode_reply(func: &Function, data: &[u8]) -> Result<Value, String> {
    if func.outputs.is_empty() {
        return Ok(Value::Null);
    }
    let values = func
        .abi_decode_output(data, true)
        .map_err(|e| format!("cannot decode {} reply: {e}", func.name))?;

    if values.len() == 1 {
        return Ok(dyn_to_json(&values[0]));
    }
    let all_named = func.outputs.iter().all(|p| !p.name.is_empty());
    if all_named {
        let map: Map<String, Value> = func
            .outputs
            .iter()
            .zip(&values)
            .map(|(p, v)| (p.name.clone(), dyn_to_json(v)))
            .collect();
        Ok(Value::Object(map))
    } else {
        Ok(Value::Array(values.iter().map(dyn_to_json).collect()))
    }
}

/// Coerce a JSON value to the given Solidity type.
pub fn json_to_dyn(value: &Value, ty: &DynSolType) -> Result<DynSolValue, String> {
    match ty {
        DynSolType::Bool => match value {
            Value::Bool(b) => Ok(DynSolValue::Bool(*b)),
            Value::String(s) if s == "true" || s == "false" => Ok(DynSolValue::Bool(s == "true")),
            other => Err(format!("expected bool, got {other}")),
        },
        DynSolType::Uint(bits) => {
            let v = match value {
                Value::Number(n) => n
                    .as_u64()
                    .map(U256::from)
                    .ok_or_else(|| format!("expected unsigned integer, got {n}"))?,
                Value::String(s) => {
                    U256::from_str(s.trim()).map_err(|e| format!("invalid uint '{s}': {e}"))?
                }
                other => return Err(format!("expected uint, got {other}")),
            };
            Ok(DynSolValue::Uint(v, *bits))
        }
        DynSolType::Int(bits) => {
            let v = match value {
                Value::Number(n) => n
                    .as_i64()
                    .and_then(|i| I256::try_from(i).ok())
                    .ok_or_else(|| format!("expected integer, got {n}"))?,
                Value::String(s) => {
                    I256::from_str(s.trim()).map_err(|e| format!("invalid int '{s}': {e}"))?
                }
                other => return Err(format!("expected int, got {other}")),
            };
            Ok(DynSolValue::Int(v, *bits))
        }
        DynSolType::Address => {
            let s = value
                .as_str()
                .ok_or_else(|| format!("expected address string, got {value}"))?;
            Address::from_str(s.trim())
                .map(DynSolValue::Address)
                .map_err(|e| format!("invalid address '{s}': {e}"))
        }
        DynSolType::Bytes => decode_hex_arg(value).map(DynSolValue::Bytes),
        DynSolType::FixedBytes(size) => {
            let bytes = decode_hex_arg(value)?;
            if bytes.len() > *size {
                return Err(format!("bytes{size} given {} bytes", bytes.len()));
            }
            let mut word = [0u8; 32];
            word[..bytes.len()].copy_from_slice(&bytes);
            Ok(DynSolValue::FixedBytes(B256::from(word), *size))
        }
        DynSolType::String => match value {
            Value::String(s) => Ok(DynSolValue::String(s.clone())),
            other => Err(format!("expected string, got {other}")),
        },
        DynSolType::Array(inner) => {
            let items = value
                .as_array()
                .ok_or_else(|| format!("expected array, got {value}"))?;
            items
                .iter()
                .map(|item| json_to_dyn(item, inner))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::Array)
        }
        DynSolType::FixedArray(inner, len) => {
            let items = value
                .as_array()
                .ok_or_else(|| format!("expected array, got {value}"))?;
            if items.len() != *len {
                return Err(format!("expected {len} elements, got {}", items.len()));
            }
            items
                .iter()
                .map(|item| json_to_dyn(item, inner))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::FixedArray)
        }
        DynSolType::Tuple(types) => {
            let items = value
                .as_array()
                .ok_or_else(|| format!("expected tuple as array, got {value}"))?;
            if items.len() != types.len() {
                return Err(format!(
                    "expected {} tuple fields, got {}",
                    types.len(),
                    items.len()
                ));
            }
            items
                .iter()
                .zip(types)
                .map(|(item, ty)| json_to_dyn(item, ty))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::Tuple)
        }
        other => Err(format!("unsupported argument type {other:?}")),
    }
}

fn decode_hex_arg(value: &Value) -> Result<Vec<u8>, String> {
    let s = value
        .as_str()
        .ok_or_else(|| format!("expected hex string, got {value}"))?;
    hex::decode(s.trim().trim_start_matches("0x")).map_err(|e| format!("invalid hex '{s}': {e}"))
}

/// Render a decoded ABI value as JSON.
pub fn dyn_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Uint(v, _) => {
            if *v <= U256::from(u64::MAX) {
                Value::from(v.to::<u64>())
            } else {
                Value::String(v.to_string())
            }
        }
        DynSolValue::Int(v, _) => match i64::try_from(*v) {
            Ok(i) => Value::from(i),
            Err(_) => Value::String(v.to_string()),
        },
        DynSolValue::Address(a) => Value::String(a.to_checksum(None)),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Bytes(b) => Value::String(format!("0x{}", hex::encode(b))),
        DynSolValue::FixedBytes(word, size) => {
            Value::String(format!("0x{}", hex::encode(&word[..*size])))
        }
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(dyn_to_json).collect())
        }
        _ => Value::Null,
    }
}
