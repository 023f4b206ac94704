//! Revert payload extraction from failed calls.
//!
//! Nodes put the ABI-encoded revert data in the error object's `data` member.
//! Wallets and proxies that wrap the node's error nest it one or two levels
//! deeper, under `error.data` or `info.error.data`.

use serde_json::Value;

use chaincall_core::TransportError;

const PAYLOAD_PATHS: [&[&str]; 3] = [&["data"], &["error", "data"], &["info", "error", "data"]];

/// The revert payload carried by `err`, if any.
pub fn revert_data(err: &TransportError) -> Option<Vec<u8>> {
    match err {
        TransportError::Rpc(rpc) => {
            let object = serde_json::to_value(rpc).ok()?;
            revert_data_in(&object)
        }
        _ => None,
    }
}

/// Search a JSON error object for a revert payload, first match wins.
pub fn revert_data_in(error: &Value) -> Option<Vec<u8>> {
    PAYLOAD_PATHS
        .iter()
        .filter_map(|path| path.iter().try_fold(error, |node, key| node.get(*key)))
        .find_map(hex_payload)
}

fn hex_payload(node: &Value) -> Option<Vec<u8>> {
    let s = match node {
        Value::String(s) => s.as_str(),
        // `{ "message": ..., "data": "0x..." }` wrapped once more
        Value::Object(inner) => inner.get("data")?.as_str()?,
        _ => return None,
    };
    let digits = s.strip_prefix("0x")?;
    if digits.is_empty() {
        return None;
    }
    hex::decode(digits).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaincall_core::JsonRpcError;
    use serde_json::json;

    #[test]
    fn top_level_data() {
        let err = TransportError::Rpc(JsonRpcError::new(3, "execution reverted", Some(json!("0xdeadbeef"))));
        assert_eq!(revert_data(&err), Some(vec![0xde, 0xad, 0xbe, 0xef]));
    }

    #[test]
    fn nested_error_data() {
        let v = json!({"code": -32603, "message": "wrapped", "error": {"data": "0x01"}});
        assert_eq!(revert_data_in(&v), Some(vec![0x01]));
    }

    #[test]
    fn nested_info_error_data() {
        let raw = r#"{"code":-32603,"message":"Internal JSON-RPC error.","info":{"error":{"data":"0x0102"}}}"#;
        let err = TransportError::Rpc(serde_json::from_str(raw).unwrap());
        assert_eq!(revert_data(&err), Some(vec![0x01, 0x02]));
    }

    #[test]
    fn top_level_wins_over_nested() {
        let v = json!({"data": "0xaa", "error": {"data": "0xbb"}});
        assert_eq!(revert_data_in(&v), Some(vec![0xaa]));
    }

    #[test]
    fn data_object_wrapping_payload() {
        let v = json!({"data": {"message": "execution reverted", "data": "0xcc"}});
        assert_eq!(revert_data_in(&v), Some(vec![0xcc]));
    }

    #[test]
    fn unusable_data_falls_through() {
        let v = json!({"data": "execution reverted", "error": {"data": "0x"}, "info": {"error": {"data": "0x02"}}});
        assert_eq!(revert_data_in(&v), Some(vec![0x02]));
    }

    #[test]
    fn no_payload() {
        assert_eq!(revert_data(&TransportError::Http("refused".into())), None);
        let err = TransportError::Rpc(JsonRpcError::new(-32000, "nonce too low", None));
        assert_eq!(revert_data(&err), None);
    }
}
