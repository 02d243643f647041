//! Telemetry wire format.
//!
//! The engine speaks one JSON document per `SOCK_SEQPACKET` message:
//!
//! ```text
//! engine -> client   {"version":"DPDK 23.11.0","pid":4242,"max_output_len":16384}
//! client -> engine   /ethdev/stats,0
//! engine -> client   {"/ethdev/stats":{"ipackets":100,"opackets":50,...}}
//! ```
//!
//! Commands are a path token optionally followed by `,<param>`. The response
//! envelope is keyed by the path token only.

use crate::config::TelemetryConfig;
use crate::error::{PmdError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Greeting sent by the engine right after accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitMessage {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub pid: u32,
    /// Largest response the engine will ever send; 0 means undeclared.
    #[serde(default)]
    pub max_output_len: usize,
}

impl InitMessage {
    /// Decode and validate a greeting.
    ///
    /// Returns a human-readable reason on failure; the session wraps it in a
    /// `Handshake` error with the socket path.
    pub fn parse(bytes: &[u8]) -> std::result::Result<Self, String> {
        let msg: InitMessage = serde_json::from_slice(bytes)
            .map_err(|e| format!("failed to unmarshal init message: {}", e))?;
        if msg.max_output_len == 0 {
            return Err("init message does not declare max_output_len".to_string());
        }
        if msg.max_output_len > TelemetryConfig::MAX_OUTPUT_LEN_LIMIT {
            return Err(format!(
                "max_output_len {} exceeds limit {}",
                msg.max_output_len,
                TelemetryConfig::MAX_OUTPUT_LEN_LIMIT
            ));
        }
        Ok(msg)
    }
}

/// Command text before the first comma; also the envelope key.
pub fn path_token(command: &str) -> &str {
    match command.split_once(',') {
        Some((path, _)) => path,
        None => command,
    }
}

/// Build `<path>,<param>`.
pub fn with_param(path: &str, param: impl std::fmt::Display) -> String {
    format!("{},{}", path, param)
}

/// Pull the value for `command`'s path token out of a raw response.
///
/// The response must be a JSON object. A missing key and an explicit `null`
/// both mean the engine answered with nothing.
pub fn extract_value(command: &str, response: &[u8]) -> Result<Value> {
    let mut envelope: Map<String, Value> =
        serde_json::from_slice(response).map_err(|e| PmdError::Parse {
            command: command.to_string(),
            source: e,
        })?;

    match envelope.remove(path_token(command)) {
        None | Some(Value::Null) => Err(PmdError::EmptyValue {
            command: path_token(command).to_string(),
        }),
        Some(value) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_init_message_parse() {
        let greeting = br#"{"version":"DPDK 23.11.0","pid":123,"max_output_len":16384}"#;
        let msg = InitMessage::parse(greeting).unwrap();
        assert_eq!(msg.version, "DPDK 23.11.0");
        assert_eq!(msg.pid, 123);
        assert_eq!(msg.max_output_len, 16384);
    }

    #[test]
    fn test_init_message_zero_max_len_rejected() {
        let err =
            InitMessage::parse(br#"{"version":"v1","pid":123,"max_output_len":0}"#).unwrap_err();
        assert!(err.contains("max_output_len"));
    }

    #[test]
    fn test_init_message_missing_max_len_rejected() {
        assert!(InitMessage::parse(br#"{"version":"v1","pid":123}"#).is_err());
    }

    #[test]
    fn test_init_message_oversized_max_len_rejected() {
        let body = format!(
            r#"{{"version":"v1","pid":1,"max_output_len":{}}}"#,
            TelemetryConfig::MAX_OUTPUT_LEN_LIMIT + 1
        );
        assert!(InitMessage::parse(body.as_bytes()).is_err());
    }

    #[test]
    fn test_init_message_not_json_rejected() {
        assert!(InitMessage::parse(b"hello").is_err());
        assert!(InitMessage::parse(b"").is_err());
    }

    #[test]
    fn test_path_token_and_with_param() {
        assert_eq!(path_token("/ethdev/stats,3"), "/ethdev/stats");
        assert_eq!(path_token("/ethdev/list"), "/ethdev/list");
        assert_eq!(path_token("/a,b,c"), "/a");
        assert_eq!(with_param("/ethdev/info", 7), "/ethdev/info,7");
    }

    #[test]
    fn test_extract_value_uses_path_token() {
        let value = extract_value(
            "/ethdev/stats,3",
            br#"{"/ethdev/stats":{"ipackets":100},"/other":1}"#,
        )
        .unwrap();
        assert_eq!(value, json!({"ipackets": 100}));
    }

    #[test]
    fn test_extract_value_null_or_missing_is_empty() {
        let err = extract_value("/ethdev/list", br#"{"/ethdev/list":null}"#).unwrap_err();
        assert!(matches!(err, PmdError::EmptyValue { .. }));

        let err = extract_value("/ethdev/list", br#"{"/ethdev/info":[]}"#).unwrap_err();
        assert!(matches!(err, PmdError::EmptyValue { .. }));
    }

    #[test]
    fn test_extract_value_keeps_falsy_values() {
        assert_eq!(extract_value("/x", br#"{"/x":[]}"#).unwrap(), json!([]));
        assert_eq!(extract_value("/x", br#"{"/x":0}"#).unwrap(), json!(0));
        assert_eq!(extract_value("/x", br#"{"/x":""}"#).unwrap(), json!(""));
    }

    #[test]
    fn test_extract_value_rejects_non_object() {
        for body in [&b"not json"[..], b"[1,2]", b"{\"/x\":"] {
            let err = extract_value("/x", body).unwrap_err();
            assert!(matches!(err, PmdError::Parse { .. }));
        }
    }
}
