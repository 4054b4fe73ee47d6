//! Model Context Protocol: JSON-RPC dispatch, the stdio and HTTP+SSE
//! transport state machines, session lifecycle, server-side registries,
//! client RPC facade, and the OAuth protected-resource gate for HTTP.
//!
//! Build a server from [`server::ServerBuilder`], or connect a client with
//! [`client::Client::connect`]. [`prelude`] re-exports the common surface.

#![warn(missing_debug_implementations)]
#![warn(clippy::all)]

pub use turbomcp_core as core;
pub use turbomcp_protocol as protocol;
pub use turbomcp_transport as transport;

pub use turbomcp_server as server;

pub use turbomcp_client as client;

pub use turbomcp_auth as auth;

/// Install a `tracing-subscriber` fmt layer reading `RUST_LOG` (default
/// `info`).
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}

pub mod prelude {
    pub use turbomcp_core::{Error, ErrorKind, RequestId, Result, SessionId};
    pub use turbomcp_protocol::jsonrpc::{JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
    pub use turbomcp_protocol::types::{
        ClientCapabilities, Content, InitializeResult, PromptDescriptor, ResourceContent,
        ResourceDescriptor, ServerCapabilities, ToolCallResult, ToolDescriptor,
    };
    pub use turbomcp_server::prelude::*;
    pub use turbomcp_transport::{Transport, TransportState};

    pub use turbomcp_client::{Client, NotificationEvent};

    pub use turbomcp_auth::prelude::*;

    pub use crate::init_tracing;
}
