//! JSON-RPC 2.0 envelope types and classification.
//!
//! Classification is structural: `method` + `id` is a request, `method`
//! without `id` is a notification, `id` with `result` xor `error` is a
//! response. There is no batch variant — this wire format never nests an
//! array of envelopes at the top level.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use turbomcp_core::{Error, ErrorKind, RequestId};

/// The literal `"2.0"` JSON-RPC version marker.
///
/// A unit struct with hand-written `Serialize`/`Deserialize` so that any
/// other string value fails to deserialize rather than being silently
/// accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str("2.0")
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s == "2.0" {
            Ok(JsonRpcVersion)
        } else {
            Err(serde::de::Error::custom(format!(
                "unsupported jsonrpc version: {s}"
            )))
        }
    }
}

/// A JSON-RPC request: expects a response correlated by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: JsonRpcVersion,
    pub id: RequestId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC notification: fire-and-forget, no `id`, no response expected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: JsonRpcVersion,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            method: method.into(),
            params,
        }
    }
}

/// The JSON-RPC error object carried by a failed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl From<&Error> for JsonRpcError {
    fn from(err: &Error) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

/// Either a successful result or an error object; exactly one is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcResponsePayload {
    Result { result: Value },
    Error { error: JsonRpcError },
}

/// A JSON-RPC response, correlated to its request by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: JsonRpcVersion,
    pub id: RequestId,
    #[serde(flatten)]
    pub payload: JsonRpcResponsePayload,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id,
            payload: JsonRpcResponsePayload::Result { result },
        }
    }

    pub fn error(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id,
            payload: JsonRpcResponsePayload::Error { error },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.payload, JsonRpcResponsePayload::Error { .. })
    }
}

/// Any one of the three envelope shapes this wire format carries.
///
/// `#[serde(untagged)]` tries each variant in order; request is listed first
/// since it's structurally the most specific (both `id` and `method`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    Response(JsonRpcResponse),
}

impl JsonRpcMessage {
    /// The request id carried by this message, if any (`Notification` has
    /// none).
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(r) => Some(&r.id),
            Self::Notification(_) => None,
            Self::Response(r) => Some(&r.id),
        }
    }

    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(r) => Some(&r.method),
            Self::Notification(n) => Some(&n.method),
            Self::Response(_) => None,
        }
    }
}

/// Parse one JSON-RPC envelope from a complete text frame.
///
/// Field lookups are case-insensitive per the wire format's tolerance for
/// case variation in `jsonrpc`/`id`/`method`/`params`/`result`/`error`:
/// this function first normalizes a raw object's top-level keys to their
/// canonical lowercase spelling, then classifies structurally before
/// deserializing into the matching type. Classification failures produce a
/// [`ErrorKind::ParseError`] (malformed JSON) or [`ErrorKind::InvalidRequest`]
/// (well-formed JSON, not a valid envelope shape).
pub fn parse_message(input: &str) -> Result<JsonRpcMessage, Error> {
    let raw: Value = serde_json::from_str(input).map_err(|e| {
        tracing::debug!(error = %e, "failed to parse JSON-RPC frame");
        Error::from(e)
    })?;
    parse_value(raw)
}

/// As [`parse_message`], but starting from an already-parsed [`Value`] (used
/// by transports that receive pre-parsed SSE `data:` payloads).
pub fn parse_value(raw: Value) -> Result<JsonRpcMessage, Error> {
    let obj = normalize_case(raw)
        .as_object()
        .cloned()
        .ok_or_else(|| Error::new(ErrorKind::InvalidRequest))?;

    let has_method = obj.contains_key("method");
    let has_id = obj.contains_key("id") && !obj["id"].is_null();
    let has_result_or_error = obj.contains_key("result") || obj.contains_key("error");

    let value = Value::Object(obj);
    if has_method && has_id {
        let req: JsonRpcRequest = serde_json::from_value(value).map_err(Error::from)?;
        Ok(JsonRpcMessage::Request(req))
    } else if has_method {
        let note: JsonRpcNotification = serde_json::from_value(value).map_err(Error::from)?;
        Ok(JsonRpcMessage::Notification(note))
    } else if has_id && has_result_or_error {
        let resp: JsonRpcResponse = serde_json::from_value(value).map_err(Error::from)?;
        Ok(JsonRpcMessage::Response(resp))
    } else {
        Err(Error::new(ErrorKind::InvalidRequest))
    }
}

/// Lowercase every key of a top-level JSON object so `ID`, `Id`, `METHOD`,
/// etc. are all recognized. Leaves nested objects (`params`, `result`,
/// `error.data`) untouched — only the envelope's own keys are case-folded.
fn normalize_case(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut normalized = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                normalized.insert(k.to_ascii_lowercase(), v);
            }
            Value::Object(normalized)
        }
        other => other,
    }
}

/// Serialize a message back to its single-line JSON text form.
pub fn serialize_message(message: &JsonRpcMessage) -> Result<String, Error> {
    serde_json::to_string(message).map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn classifies_request() {
        let msg = parse_message(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
        assert!(matches!(msg, JsonRpcMessage::Request(_)));
        assert_eq!(msg.id(), Some(&RequestId::number(1)));
    }

    #[test]
    fn classifies_notification() {
        let msg =
            parse_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert!(matches!(msg, JsonRpcMessage::Notification(_)));
        assert_eq!(msg.id(), None);
    }

    #[test]
    fn classifies_success_response() {
        let msg = parse_message(r#"{"jsonrpc":"2.0","id":"call-1","result":{}}"#).unwrap();
        assert!(matches!(msg, JsonRpcMessage::Response(_)));
    }

    #[test]
    fn classifies_error_response() {
        let msg =
            parse_message(r#"{"jsonrpc":"2.0","id":"x","error":{"code":-32601,"message":"m"}}"#)
                .unwrap();
        match msg {
            JsonRpcMessage::Response(r) => assert!(r.is_error()),
            _ => panic!("expected response"),
        }
    }

    #[test]
    fn case_insensitive_field_names() {
        let msg = parse_message(r#"{"JSONRPC":"2.0","ID":7,"METHOD":"ping"}"#).unwrap();
        assert_eq!(msg.id(), Some(&RequestId::number(7)));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = parse_message("{not json").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ParseError);
    }

    #[test]
    fn well_formed_but_not_an_envelope_is_invalid_request() {
        let err = parse_message(r#"{"jsonrpc":"2.0"}"#).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidRequest);
    }

    #[test]
    fn numeric_id_round_trips_as_number() {
        let original = r#"{"jsonrpc":"2.0","id":9007199254740993,"method":"ping"}"#;
        // This particular literal overflows f64's 53-bit mantissa but fits i64.
        let msg = parse_message(original).unwrap();
        let out = serialize_message(&msg).unwrap();
        let reparsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(reparsed["id"], serde_json::json!(9007199254740993i64));
    }

    #[test]
    fn string_id_round_trips_as_string() {
        let msg = parse_message(r#"{"jsonrpc":"2.0","id":"abc","method":"ping"}"#).unwrap();
        let out = serialize_message(&msg).unwrap();
        let reparsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(reparsed["id"], Value::String("abc".into()));
    }

    proptest::proptest! {
        #[test]
        fn encode_decode_round_trips_request_ids(n in proptest::num::i64::ANY, method in "[a-z/]{1,16}") {
            let req = JsonRpcRequest::new(RequestId::number(n), method.clone(), None);
            let msg = JsonRpcMessage::Request(req);
            let text = serialize_message(&msg).unwrap();
            let back = parse_message(&text).unwrap();
            prop_assert_eq!(back.id(), Some(&RequestId::number(n)));
            prop_assert_eq!(back.method(), Some(method.as_str()));
        }
    }
}
