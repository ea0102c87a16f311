//! JSON-RPC transport layer.
//!
//! This module provides the wire encoding shared by every connection:
//! header-delimited framing and the JSON-RPC 2.0 envelope types.

pub mod transport;
pub mod types;

pub use transport::MessageTransport;
pub use types::{
    ErrorCode, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, Message,
    RequestId,
};
