//! JSON-RPC 2.0 message types.
//!
//! Inbound payloads are classified exactly once, at the framing boundary,
//! into the closed [`Message`] union. Everything downstream matches on it.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The only protocol version this server speaks.
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version, always "2.0".
    pub jsonrpc: String,
    /// Request identifier.
    pub id: RequestId,
    /// Method name.
    pub method: String,
    /// Optional method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version, always "2.0".
    pub jsonrpc: String,
    /// Request identifier; `null` when the request id could not be read.
    pub id: Option<RequestId>,
    /// Result value (if successful).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error object (if failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Successful response carrying `result`.
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    /// Error response. `id` is `None` when the offending request had no readable id.
    #[must_use]
    pub fn failure(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC 2.0 notification message (no response expected).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// JSON-RPC version, always "2.0".
    pub jsonrpc: String,
    /// Method name.
    pub method: String,
    /// Optional method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Build a notification from any serializable params.
    ///
    /// # Errors
    ///
    /// Returns an error if `params` cannot be serialized.
    pub fn new<P: Serialize>(method: &str, params: P) -> serde_json::Result<Self> {
        Ok(Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params: Some(serde_json::to_value(params)?),
        })
    }
}

/// Standard JSON-RPC error codes used by this server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received.
    ParseError,
    /// The JSON sent is not a valid request object, or not valid in the current state.
    InvalidRequest,
    /// The method does not exist.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal error while serving the request.
    InternalError,
}

impl ErrorCode {
    /// Numeric code sent on the wire.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i32,
    /// Error message.
    pub message: String,
    /// Optional additional error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Create an error object for one of the standard codes.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// `MethodNotFound` error for `method`.
    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::new(ErrorCode::MethodNotFound, format!("method not found: {method}"))
    }

    /// `InvalidParams` error.
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParams, message)
    }

    /// `InternalError` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// Request ID can be a number or string per JSON-RPC 2.0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Carries an `id` and a `method`; must be answered exactly once.
    Request(JsonRpcRequest),
    /// A client reply to a server-initiated request.
    Response(JsonRpcResponse),
    /// Carries a `method` but no `id`; never answered.
    Notification(JsonRpcNotification),
    /// Well-framed, but not a valid JSON-RPC 2.0 message.
    Malformed {
        /// The id, when one could be recovered.
        id: Option<RequestId>,
        /// The error to answer with.
        error: JsonRpcError,
    },
}

impl Message {
    /// Classify a raw payload.
    ///
    /// Never fails: anything that is not a usable JSON-RPC 2.0 message becomes
    /// [`Message::Malformed`] carrying the error it should be answered with.
    #[must_use]
    pub fn from_slice(payload: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(payload) {
            Ok(value) => Self::from_value(value),
            Err(e) => Self::Malformed {
                id: None,
                error: JsonRpcError::new(
                    ErrorCode::ParseError,
                    format!("could not parse message: {e}"),
                ),
            },
        }
    }

    /// Classify an already-parsed JSON value.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut object) = value else {
            return invalid(None, "message must be a JSON object");
        };

        let id = match object.remove("id") {
            None | Some(Value::Null) => None,
            Some(raw) => match serde_json::from_value::<RequestId>(raw) {
                Ok(id) => Some(id),
                Err(_) => return invalid(None, "id must be a number or a string"),
            },
        };

        match object.get("jsonrpc").and_then(Value::as_str) {
            Some(JSONRPC_VERSION) => {}
            Some(other) => return invalid(id, format!("unsupported jsonrpc version: {other}")),
            None => return invalid(id, "missing jsonrpc version"),
        }

        let params = object.remove("params");
        let method = match object.remove("method") {
            Some(Value::String(method)) => Some(method),
            Some(_) => return invalid(id, "method must be a string"),
            None => None,
        };

        match (id, method) {
            (Some(id), Some(method)) => Self::Request(JsonRpcRequest {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id,
                method,
                params,
            }),
            (None, Some(method)) => Self::Notification(JsonRpcNotification {
                jsonrpc: JSONRPC_VERSION.to_string(),
                method,
                params,
            }),
            (id, None) => response_from_parts(id, object),
        }
    }

    /// Method name for requests and notifications.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(request) => Some(&request.method),
            Self::Notification(notification) => Some(&notification.method),
            Self::Response(_) | Self::Malformed { .. } => None,
        }
    }
}

fn response_from_parts(id: Option<RequestId>, mut object: Map<String, Value>) -> Message {
    let result = object.remove("result");
    let error = match object.remove("error") {
        None => None,
        Some(raw) => match serde_json::from_value::<JsonRpcError>(raw) {
            Ok(error) => Some(error),
            Err(_) => return invalid(id, "malformed error object"),
        },
    };

    if result.is_none() && error.is_none() {
        return invalid(id, "message has neither method nor result");
    }

    Message::Response(JsonRpcResponse {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id,
        result,
        error,
    })
}

fn invalid(id: Option<RequestId>, message: impl Into<String>) -> Message {
    Message::Malformed {
        id,
        error: JsonRpcError::invalid_request(message),
    }
}
