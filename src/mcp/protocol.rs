//! JSON-RPC 2.0 framing for the MCP endpoint.
//!
//! Each `POST /mcp` body carries exactly one message:
//!
//! - **Request**: has an `id` and gets exactly one response or error
//! - **Notification**: no `id`, acknowledged at the HTTP level only
//!
//! Request IDs are strings or integers, never `null`. Batches were dropped
//! from the protocol in 2025-06-18 and are rejected for every version.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// The latest MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

/// Every protocol version this server can speak, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "todo-widget-mcp";

/// Picks the protocol version to answer an `initialize` request with.
///
/// A supported requested version is echoed back; anything else gets the
/// latest version and the client decides whether to continue.
#[must_use]
pub fn negotiate_version(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .find(|v| **v == requested)
        .copied()
        .unwrap_or(MCP_PROTOCOL_VERSION)
}

/// The `"jsonrpc": "2.0"` marker.
///
/// Deserialising anything other than the exact string `"2.0"` fails, so a
/// message that decodes is already known to be JSON-RPC 2.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Version;

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("2.0")
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == "2.0" {
            Ok(Self)
        } else {
            Err(de::Error::invalid_value(
                de::Unexpected::Str(&raw),
                &"jsonrpc version \"2.0\"",
            ))
        }
    }
}

/// A JSON-RPC request ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// A request: a method call that expects an answer.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(rename = "jsonrpc")]
    _version: Version,

    /// Identifier echoed back in the answer.
    pub id: RequestId,

    /// The method to invoke.
    pub method: String,

    /// Method parameters, if any.
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Decodes `params` into `T`, treating absent params as `{}`.
    ///
    /// # Errors
    ///
    /// Returns an invalid-params error naming `what` if decoding fails.
    pub fn params_as<T>(&self, what: &str) -> Result<T, JsonRpcError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let params = self
            .params
            .clone()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        serde_json::from_value(params).map_err(|e| {
            JsonRpcError::invalid_params(self.id.clone(), format!("Invalid {what} params: {e}"))
        })
    }
}

/// A one-way message.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcNotification {
    #[serde(rename = "jsonrpc")]
    _version: Version,

    /// The notification method.
    pub method: String,

    /// Notification parameters, if any.
    #[serde(default)]
    pub params: Option<Value>,
}

/// A successful answer.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: Version,

    /// The request ID this response corresponds to.
    pub id: RequestId,

    /// The result of the method call.
    pub result: Value,
}

impl JsonRpcResponse {
    /// Wraps `result` as the answer to request `id`.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: Version,
            id,
            result,
        }
    }
}

/// Error codes used by this server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    /// The body is not valid JSON.
    ParseError = -32700,
    /// The JSON is not a valid single message.
    InvalidRequest = -32600,
    /// Unknown method.
    MethodNotFound = -32601,
    /// Parameters do not match the method.
    InvalidParams = -32602,
    /// The server failed while handling a valid request.
    InternalError = -32603,
    /// Transport-level rejection (e.g. unsupported HTTP method).
    ServerError = -32000,
}

impl ErrorCode {
    /// Numeric value sent on the wire.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// The `error` member of an error answer.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorObject {
    /// Numeric error code.
    pub code: i32,

    /// Human-readable description.
    pub message: String,

    /// Additional information about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// An error answer.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    jsonrpc: Version,

    /// The request ID, serialised as `null` when it could not be read.
    pub id: Option<RequestId>,

    /// The error details.
    pub error: ErrorObject,
}

impl JsonRpcError {
    /// Builds an error answer.
    #[must_use]
    pub fn new(id: Option<RequestId>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: Version,
            id,
            error: ErrorObject {
                code: code.code(),
                message: message.into(),
                data: None,
            },
        }
    }

    /// The body was not JSON.
    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(None, ErrorCode::ParseError, "Parse error")
    }

    /// The JSON was not an acceptable message.
    #[must_use]
    pub fn invalid_request(id: Option<RequestId>, message: impl Into<String>) -> Self {
        Self::new(id, ErrorCode::InvalidRequest, message)
    }

    /// The method is not served here.
    #[must_use]
    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::new(
            Some(id),
            ErrorCode::MethodNotFound,
            format!("Method not found: {method}"),
        )
    }

    /// The params do not decode for the method.
    #[must_use]
    pub fn invalid_params(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(Some(id), ErrorCode::InvalidParams, message)
    }

    /// Handling a valid request failed.
    #[must_use]
    pub fn internal_error(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(Some(id), ErrorCode::InternalError, message)
    }
}

/// One decoded message from a request body.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// A request expecting a response.
    Request(JsonRpcRequest),
    /// A notification (no response expected).
    Notification(JsonRpcNotification),
}

impl IncomingMessage {
    /// Returns the method name of this message.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Request(req) => &req.method,
            Self::Notification(notif) => &notif.method,
        }
    }

    /// Returns the request ID if this is a request.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(req) => Some(&req.id),
            Self::Notification(_) => None,
        }
    }
}

/// Decodes one message from a request body.
///
/// The presence of an `id` member decides between request and
/// notification. Once the `id` is readable it is carried on any later
/// rejection so the client can correlate it.
///
/// # Errors
///
/// Returns a parse error for invalid JSON and an invalid-request error for
/// batches, non-objects, bad IDs, and malformed messages.
pub fn parse_message(json: &str) -> Result<IncomingMessage, JsonRpcError> {
    let value: Value = serde_json::from_str(json).map_err(|_| JsonRpcError::parse_error())?;

    let Value::Object(obj) = &value else {
        let reason = if value.is_array() {
            "Batch requests are not supported"
        } else {
            "Message must be a JSON object"
        };
        return Err(JsonRpcError::invalid_request(None, reason));
    };

    let id = obj
        .get("id")
        .map(|raw| {
            RequestId::deserialize(raw).map_err(|_| {
                JsonRpcError::invalid_request(None, "id must be a string or an integer")
            })
        })
        .transpose()?;

    let message = match id {
        Some(id) => {
            let request: JsonRpcRequest = serde_json::from_value(value)
                .map_err(|e| JsonRpcError::invalid_request(Some(id), e.to_string()))?;
            IncomingMessage::Request(request)
        }
        None => {
            let notification: JsonRpcNotification = serde_json::from_value(value)
                .map_err(|e| JsonRpcError::invalid_request(None, e.to_string()))?;
            IncomingMessage::Notification(notification)
        }
    };

    if message.method().is_empty() {
        return Err(JsonRpcError::invalid_request(
            message.id().cloned(),
            "method must not be empty",
        ));
    }
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(json: &str) -> JsonRpcError {
        parse_message(json).expect_err("message should be rejected")
    }

    #[test]
    fn parse_request_with_numeric_id() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#;
        let IncomingMessage::Request(req) = parse_message(json).unwrap() else {
            panic!("Expected Request, got Notification");
        };
        assert_eq!(req.id, RequestId::Number(1));
        assert_eq!(req.method, "initialize");
    }

    #[test]
    fn parse_request_with_string_id() {
        let msg = parse_message(r#"{"jsonrpc": "2.0", "id": "abc-123", "method": "ping"}"#)
            .unwrap();
        assert_eq!(msg.id(), Some(&RequestId::String("abc-123".to_string())));
        assert_eq!(msg.method(), "ping");
    }

    #[test]
    fn message_without_id_is_notification() {
        let msg = parse_message(r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#)
            .unwrap();
        assert!(matches!(msg, IncomingMessage::Notification(_)));
        assert_eq!(msg.id(), None);
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let err = rejected("not valid json");
        assert_eq!(err.error.code, ErrorCode::ParseError.code());
        assert!(err.id.is_none());
    }

    #[test]
    fn version_must_be_two_point_zero() {
        for json in [
            r#"{"id": 1, "method": "ping"}"#,
            r#"{"jsonrpc": "1.0", "id": 1, "method": "ping"}"#,
            r#"{"jsonrpc": 2, "id": 1, "method": "ping"}"#,
        ] {
            let err = rejected(json);
            assert_eq!(err.error.code, ErrorCode::InvalidRequest.code(), "{json}");
            assert_eq!(err.id, Some(RequestId::Number(1)));
        }
    }

    #[test]
    fn null_id_is_rejected() {
        let err = rejected(r#"{"jsonrpc": "2.0", "id": null, "method": "ping"}"#);
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn empty_method_is_rejected() {
        let err = rejected(r#"{"jsonrpc": "2.0", "id": "x", "method": ""}"#);
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
        assert_eq!(err.id, Some(RequestId::String("x".to_string())));
    }

    #[test]
    fn batch_is_rejected() {
        let err = rejected(r#"[{"jsonrpc": "2.0", "id": 1, "method": "ping"}]"#);
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
        assert!(err.error.message.contains("Batch"));
    }

    #[test]
    fn scalar_body_is_rejected() {
        assert_eq!(rejected("42").error.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn params_default_to_empty_object() {
        #[derive(Deserialize)]
        struct Empty {}

        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": "tools/list"}"#;
        let IncomingMessage::Request(req) = parse_message(json).unwrap() else {
            panic!("Expected Request");
        };
        assert!(req.params_as::<Empty>("tools/list").is_ok());
    }

    #[test]
    fn negotiate_known_and_unknown_versions() {
        assert_eq!(negotiate_version("2024-11-05"), "2024-11-05");
        assert_eq!(negotiate_version("2025-03-26"), "2025-03-26");
        assert_eq!(negotiate_version("1999-01-01"), MCP_PROTOCOL_VERSION);
    }

    #[test]
    fn serialise_answers() {
        let ok = JsonRpcResponse::success(RequestId::Number(1), serde_json::json!({"ok": true}));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": {"ok": true}})
        );

        let err = JsonRpcError::method_not_found(RequestId::Number(1), "unknown/method");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["error"]["code"], -32601);
        assert!(value["error"].get("data").is_none());

        let parse = serde_json::to_value(JsonRpcError::parse_error()).unwrap();
        assert!(parse["id"].is_null());
    }
}
