//! JSON-RPC 2.0 wire codec and the MCP message vocabulary built on top of it.

#![warn(missing_debug_implementations)]
#![warn(clippy::all)]

pub mod jsonrpc;
pub mod methods;
pub mod types;

pub use jsonrpc::{
    JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
};
pub use turbomcp_core::{Error, ErrorKind, RequestId, Result};
